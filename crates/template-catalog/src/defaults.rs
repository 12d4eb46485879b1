//! Built-in template definitions.

use crate::catalog::Tier;

/// A single built-in template definition.
pub struct TemplateDef {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub platform: &'static str,
    pub category: &'static str,
    pub tier: Tier,
}

const fn def(
    name: &'static str,
    width: u32,
    height: u32,
    platform: &'static str,
    category: &'static str,
    tier: Tier,
) -> TemplateDef {
    TemplateDef {
        name,
        width,
        height,
        platform,
        category,
        tier,
    }
}

/// Every template shipped with the catalog, in display order.
pub const TEMPLATE_DEFS: &[TemplateDef] = &[
    // Free tier
    def("Instagram Post", 1080, 1080, "Instagram", "post", Tier::Free),
    def("Instagram Story", 1080, 1920, "Instagram", "story", Tier::Free),
    def("Facebook Post", 1200, 630, "Facebook", "post", Tier::Free),
    def("Twitter Post", 1200, 675, "Twitter", "post", Tier::Free),
    def("LinkedIn Post", 1200, 627, "LinkedIn", "post", Tier::Free),
    def("YouTube Thumbnail", 1280, 720, "YouTube", "thumbnail", Tier::Free),
    // Pro tier
    def("Instagram Portrait", 1080, 1350, "Instagram", "post", Tier::Pro),
    def("Instagram Landscape", 1080, 566, "Instagram", "post", Tier::Pro),
    def("Facebook Cover", 820, 312, "Facebook", "cover", Tier::Pro),
    def("Facebook Story", 1080, 1920, "Facebook", "story", Tier::Pro),
    def("Twitter Header", 1500, 500, "Twitter", "cover", Tier::Pro),
    def("LinkedIn Banner", 1584, 396, "LinkedIn", "cover", Tier::Pro),
    def("YouTube Channel Art", 2560, 1440, "YouTube", "cover", Tier::Pro),
    def("Pinterest Pin", 1000, 1500, "Pinterest", "post", Tier::Pro),
    def("TikTok Cover", 1080, 1920, "TikTok", "story", Tier::Pro),
    def("Open Graph Image", 1200, 630, "Web", "link-preview", Tier::Pro),
];
