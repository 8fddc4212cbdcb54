//! Static facet configuration: definitions, per-catalog-type profiles,
//! catalog-type resolution, and the extraction dictionaries.
//!
//! The keyword dictionaries carry the Vietnamese storefront vocabulary; the
//! mechanism (ordered specification-key probes, case-insensitive substring
//! pattern match) is language-agnostic.

use super::types::{CatalogType, FacetDefinition, FacetId, TypeProfile};

/// Cache key prefix for stored filter results.
pub const CACHE_PREFIX: &str = "catalog_filters";

/// Default per-facet option limit.
const DEFAULT_OPTION_LIMIT: usize = 20;

const FACET_DEFINITIONS: [FacetDefinition; 9] = [
    FacetDefinition {
        id: FacetId::Country,
        field: "country",
        label: "Nước sản xuất",
        kind: "checkbox",
        searchable: true,
        option_limit: Some(DEFAULT_OPTION_LIMIT),
    },
    FacetDefinition {
        id: FacetId::Brand,
        field: "brand",
        label: "Thương hiệu",
        kind: "checkbox",
        searchable: true,
        option_limit: Some(DEFAULT_OPTION_LIMIT),
    },
    FacetDefinition {
        id: FacetId::PriceRange,
        field: "price_value",
        label: "Giá bán",
        kind: "checkbox",
        searchable: false,
        option_limit: None,
    },
    FacetDefinition {
        id: FacetId::TargetAudience,
        field: "targetAudience",
        label: "Đối tượng sử dụng",
        kind: "checkbox",
        searchable: true,
        option_limit: Some(DEFAULT_OPTION_LIMIT),
    },
    FacetDefinition {
        id: FacetId::Flavor,
        field: "flavor",
        label: "Mùi vị/Mùi hương",
        kind: "checkbox",
        searchable: true,
        option_limit: Some(DEFAULT_OPTION_LIMIT),
    },
    FacetDefinition {
        id: FacetId::Indication,
        field: "indication",
        label: "Chỉ định",
        kind: "checkbox",
        searchable: true,
        option_limit: Some(DEFAULT_OPTION_LIMIT),
    },
    FacetDefinition {
        id: FacetId::SkinType,
        field: "skinType",
        label: "Loại da",
        kind: "checkbox",
        searchable: true,
        option_limit: Some(DEFAULT_OPTION_LIMIT),
    },
    FacetDefinition {
        id: FacetId::MedicineType,
        field: "medicineType",
        label: "Dạng bào chế",
        kind: "checkbox",
        searchable: true,
        option_limit: Some(DEFAULT_OPTION_LIMIT),
    },
    FacetDefinition {
        id: FacetId::Ingredients,
        field: "ingredients",
        label: "Thành phần",
        kind: "checkbox",
        searchable: true,
        option_limit: Some(DEFAULT_OPTION_LIMIT),
    },
];

/// Static configuration for a facet id.
pub fn definition(id: FacetId) -> &'static FacetDefinition {
    // FACET_DEFINITIONS covers every FacetId variant; the fallback is
    // unreachable but keeps the lookup total.
    FACET_DEFINITIONS
        .iter()
        .find(|d| d.id == id)
        .unwrap_or(&FACET_DEFINITIONS[0])
}

const MEDICINE_PROFILE: TypeProfile = TypeProfile {
    enabled: &[
        FacetId::PriceRange,
        FacetId::Brand,
        FacetId::Country,
        FacetId::TargetAudience,
        FacetId::Indication,
        FacetId::MedicineType,
        FacetId::Ingredients,
    ],
    priority: &[
        FacetId::PriceRange,
        FacetId::Brand,
        FacetId::Indication,
        FacetId::MedicineType,
        FacetId::TargetAudience,
        FacetId::Ingredients,
        FacetId::Country,
    ],
};

const COSMETICS_PROFILE: TypeProfile = TypeProfile {
    enabled: &[
        FacetId::PriceRange,
        FacetId::Brand,
        FacetId::Country,
        FacetId::TargetAudience,
        FacetId::SkinType,
        FacetId::Indication,
    ],
    priority: &[
        FacetId::PriceRange,
        FacetId::Brand,
        FacetId::TargetAudience,
        FacetId::SkinType,
        FacetId::Country,
        FacetId::Indication,
    ],
};

const SUPPLEMENTS_PROFILE: TypeProfile = TypeProfile {
    enabled: &[
        FacetId::PriceRange,
        FacetId::Brand,
        FacetId::Country,
        FacetId::TargetAudience,
        FacetId::Indication,
        FacetId::Flavor,
    ],
    priority: &[
        FacetId::PriceRange,
        FacetId::Brand,
        FacetId::Country,
        FacetId::TargetAudience,
        FacetId::Flavor,
        FacetId::Indication,
    ],
};

const DEFAULT_PROFILE: TypeProfile = TypeProfile {
    enabled: &[
        FacetId::PriceRange,
        FacetId::Brand,
        FacetId::Country,
        FacetId::TargetAudience,
        FacetId::Indication,
        FacetId::Flavor,
    ],
    priority: &[
        FacetId::PriceRange,
        FacetId::Brand,
        FacetId::Country,
        FacetId::TargetAudience,
        FacetId::Flavor,
        FacetId::Indication,
    ],
};

/// Facet profile for a catalog type.
pub fn profile(catalog_type: CatalogType) -> &'static TypeProfile {
    match catalog_type {
        CatalogType::Medicine => &MEDICINE_PROFILE,
        CatalogType::Cosmetics => &COSMETICS_PROFILE,
        CatalogType::Supplements => &SUPPLEMENTS_PROFILE,
        CatalogType::Default => &DEFAULT_PROFILE,
    }
}

/// Ordered substring patterns mapping a root category slug to its catalog
/// type; first match wins.
const CATALOG_TYPE_PATTERNS: [(&str, CatalogType); 6] = [
    ("thuoc", CatalogType::Medicine),
    ("medicine", CatalogType::Medicine),
    ("duoc-mi-pham", CatalogType::Cosmetics),
    ("cosmetic", CatalogType::Cosmetics),
    ("thuc-pham-chuc-nang", CatalogType::Supplements),
    ("supplement", CatalogType::Supplements),
];

/// Classify a root category slug.
pub fn catalog_type_for_root_slug(root_slug: &str) -> CatalogType {
    let slug = root_slug.to_lowercase();
    for (pattern, catalog_type) in CATALOG_TYPE_PATTERNS {
        if slug.contains(pattern) {
            return catalog_type;
        }
    }
    CatalogType::Default
}

/// value → keyword list, matched case-insensitively against free text.
pub type PatternDict = &'static [(&'static str, &'static [&'static str])];

/// Ordered historical/alternate specification-map key spellings per facet.
pub fn specification_keys(id: FacetId) -> &'static [&'static str] {
    match id {
        FacetId::TargetAudience => &["targetAudience", "target_audience", "audience", "target", "for"],
        FacetId::Flavor => &["flavor", "flavour", "taste", "mùi vị", "mùi hương", "hương vị"],
        FacetId::SkinType => &["skinType", "skin_type", "loại da"],
        FacetId::Ingredients => &["ingredients", "ingredient", "thành phần"],
        _ => &[],
    }
}

pub const TARGET_AUDIENCE_PATTERNS: PatternDict = &[
    ("trẻ em", &["trẻ em", "trẻ nhỏ", "trẻ sơ sinh", "trẻ từ", "cho trẻ"]),
    ("người lớn", &["người lớn", "người trưởng thành", "người từ 18 tuổi"]),
    ("phụ nữ", &["phụ nữ", "chị em"]),
    ("người cao tuổi", &["người cao tuổi", "người già", "người lớn tuổi"]),
    ("nam giới", &["nam giới", "đàn ông"]),
    ("phụ nữ mang thai", &["phụ nữ mang thai", "bà bầu", "thai phụ"]),
    (
        "phụ nữ cho con bú",
        &["phụ nữ cho con bú", "mẹ cho con bú", "đang cho con bú"],
    ),
];

pub const INDICATION_PATTERNS: PatternDict = &[
    ("Cảm cúm", &["cảm cúm", "cảm lạnh", "sổ mũi"]),
    ("Đau đầu", &["đau đầu", "nhức đầu", "migraine"]),
    ("Đau bụng", &["đau bụng", "đau dạ dày"]),
    ("Viêm họng", &["viêm họng", "đau họng", "sưng họng"]),
    ("Ho", &["ho khan", "ho có đờm", "giảm ho"]),
    ("Sốt", &["hạ sốt", "giảm sốt"]),
    ("Đau khớp", &["đau khớp", "viêm khớp", "thấp khớp"]),
    ("Mất ngủ", &["mất ngủ", "khó ngủ", "rối loạn giấc ngủ"]),
    (
        "Tăng cường miễn dịch",
        &["tăng cường miễn dịch", "nâng cao sức đề kháng", "hỗ trợ miễn dịch"],
    ),
    ("Bổ sung vitamin", &["bổ sung vitamin", "thiếu vitamin", "vitamin"]),
    ("Bổ sung canxi", &["bổ sung canxi", "thiếu canxi", "canxi"]),
    ("Giảm stress", &["giảm stress", "giảm căng thẳng", "stress"]),
    ("Hỗ trợ tiêu hóa", &["hỗ trợ tiêu hóa", "rối loạn tiêu hóa", "tiêu hóa"]),
];

pub const SKIN_TYPE_PATTERNS: PatternDict = &[
    ("Da dầu", &["da dầu", "da nhờn"]),
    ("Da khô", &["da khô"]),
    ("Da nhạy cảm", &["da nhạy cảm"]),
    ("Da hỗn hợp", &["da hỗn hợp"]),
    ("Da mụn", &["da mụn", "da bị mụn"]),
    ("Mọi loại da", &["mọi loại da", "phù hợp với mọi loại da"]),
];

pub const MEDICINE_TYPE_PATTERNS: PatternDict = &[
    ("Viên nén", &["viên nén"]),
    ("Viên nang", &["viên nang", "viên con nhộng"]),
    ("Viên sủi", &["viên sủi"]),
    ("Siro", &["siro", "sirô"]),
    ("Thuốc bột", &["thuốc bột", "dạng bột"]),
    ("Dung dịch", &["dung dịch uống", "dung dịch tiêm"]),
    ("Thuốc nhỏ", &["thuốc nhỏ mắt", "thuốc nhỏ mũi"]),
    ("Kem bôi", &["kem bôi", "thuốc mỡ", "gel bôi"]),
];

/// Known ingredients: display value → keywords found in descriptions.
pub const INGREDIENT_PATTERNS: PatternDict = &[
    ("Vitamin C", &["vitamin c"]),
    ("Vitamin D", &["vitamin d"]),
    ("Vitamin B12", &["vitamin b12"]),
    ("Kẽm", &["kẽm", "zinc"]),
    ("Canxi", &["canxi", "calcium"]),
    ("Sắt", &["sắt", "iron"]),
    ("Magie", &["magie", "magnesium"]),
    ("Omega 3", &["omega 3", "omega-3", "dha", "epa"]),
    ("Collagen", &["collagen"]),
    ("Paracetamol", &["paracetamol", "acetaminophen"]),
    ("Ibuprofen", &["ibuprofen"]),
];
