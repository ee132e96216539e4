//! 菜品图片路径解析

/// Resolves menu image names to public URLs
#[derive(Debug, Clone)]
pub struct AssetResolver {
    base_url: String,
}

impl AssetResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/{name}` (file name lower-cased), `None` for a blank name
    pub fn resolve_image(&self, image_name: &str) -> Option<String> {
        let name = image_name.trim();
        if name.is_empty() {
            return None;
        }
        Some(format!("{}/{}", self.base_url, name.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_image() {
        let assets = AssetResolver::new("/assets/menu/");
        assert_eq!(assets.resolve_image("Tea.JPG").as_deref(), Some("/assets/menu/tea.jpg"));
        assert_eq!(assets.resolve_image("   "), None);
    }
}
