//! Askama templates for the HTML pages.

use askama::Template;
use askama_web::WebTemplate;
use shipping_mark_core::{AddressMode, ProfileTable, SelectableAddress};

/// Profile entry of the landing page selector.
pub struct ProfileOption {
    pub key: String,
    pub name: String,
    pub description: String,
    pub fixed_address: bool,
}

impl ProfileOption {
    pub fn list(profiles: &ProfileTable) -> Vec<Self> {
        profiles
            .iter()
            .map(|(key, profile)| Self {
                key: key.to_string(),
                name: profile.name.clone(),
                description: profile.description.clone(),
                fixed_address: profile.address_mode == AddressMode::Fixed,
            })
            .collect()
    }
}

/// Landing page with the label form.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub profiles: Vec<ProfileOption>,
    pub addresses: Vec<SelectableAddress>,
    pub templates: Vec<String>,
}
