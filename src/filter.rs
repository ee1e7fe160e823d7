use crate::domain::{MinSize, SearchResult};

/// Pre-filter on provider-reported dimensions. Missing dimensions count as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeFilter {
    min: Option<MinSize>,
}

impl SizeFilter {
    pub fn new(min: Option<MinSize>) -> Self {
        Self { min }
    }

    pub fn is_active(&self) -> bool {
        self.min.is_some()
    }

    pub fn accepts(&self, result: &SearchResult) -> bool {
        let Some(min) = self.min else {
            return true;
        };
        let width = result.width.unwrap_or(0);
        let height = result.height.unwrap_or(0);
        width >= min.width && height >= min.height
    }
}
