use serde::{Deserialize, Serialize};

/// One intake item and its active-substance amount per standard unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub label: String,
    pub mg_per_unit: u32,
}

/// Ordered lookup table of intake items. Iteration order is the order items were listed in,
/// which is also the order of the intake breakdown string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new<L: Into<String>>(items: impl IntoIterator<Item = (L, u32)>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|(label, mg_per_unit)| CatalogItem {
                    label: label.into(),
                    mg_per_unit,
                })
                .collect(),
        }
    }

    pub fn standard() -> Self {
        Self::new([
            ("Espresso (30 ml)", 75),
            ("Filter coffee (250 ml)", 95),
            ("Instant coffee (250 ml)", 60),
            ("Black tea (250 ml)", 45),
            ("Green tea (250 ml)", 30),
            ("Energy drink (250 ml)", 80),
            ("Cola (330 ml)", 35),
            ("Chocolate (50 g)", 10),
        ])
    }

    /// The three-item quick tracker.
    pub fn compact() -> Self {
        Self::new([("Espresso", 70), ("Filter coffee", 100), ("Tea", 40)])
    }

    /// Unknown labels weigh nothing.
    pub fn mg_per_unit(&self, label: &str) -> u32 {
        self.items
            .iter()
            .find(|it| it.label == label)
            .map(|it| it.mg_per_unit)
            .unwrap_or(0)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.items.iter().any(|it| it.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}
