//! Admin panel models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::UserRole;
use crate::wallet::TransactionStatus;

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub total_revenue: f64,
    pub orders_by_status: BTreeMap<String, u64>,
}

/// `?role=` on the role change endpoint
#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: UserRole,
}

/// `?amount=` on the balance adjustment endpoint; negative debits
#[derive(Debug, Deserialize)]
pub struct BalanceAdjustment {
    pub amount: f64,
}

/// `?status=` on the transaction status endpoint
#[derive(Debug, Deserialize)]
pub struct TransactionStatusChange {
    pub status: TransactionStatus,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FooterLink {
    pub title: String,
    pub url: String,
}

impl FooterLink {
    fn new(title: &str, url: &str) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
        }
    }
}

/// Storefront appearance and SEO settings. Missing fields take the defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SiteSettings {
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub background_color: String,
    pub text_color: String,
    pub site_name: String,
    pub site_description: String,
    pub logo_url: Option<String>,
    pub hero_image: Option<String>,
    pub footer_navigation: Vec<FooterLink>,
    pub footer_support: Vec<FooterLink>,
    pub footer_legal: Vec<FooterLink>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub og_image: Option<String>,
    pub favicon_url: Option<String>,
    pub google_analytics_id: Option<String>,
    pub yandex_metrika_id: Option<String>,
    pub robots_txt: Option<String>,
    pub custom_head_scripts: Option<String>,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            primary_color: "#00ff9d".to_string(),
            secondary_color: "#0d1117".to_string(),
            accent_color: "#00cc7d".to_string(),
            background_color: "#02040a".to_string(),
            text_color: "#ffffff".to_string(),
            site_name: "GameHub".to_string(),
            site_description: "Marketplace for game keys, items and accounts".to_string(),
            logo_url: None,
            hero_image: None,
            footer_navigation: vec![
                FooterLink::new("Catalog", "/catalog"),
                FooterLink::new("Giveaways", "/giveaways"),
                FooterLink::new("Blog", "/blog"),
            ],
            footer_support: vec![FooterLink::new("FAQ", "#"), FooterLink::new("Contacts", "#")],
            footer_legal: vec![
                FooterLink::new("Terms of use", "#"),
                FooterLink::new("Privacy policy", "#"),
            ],
            seo_title: None,
            seo_description: None,
            seo_keywords: None,
            og_image: None,
            favicon_url: None,
            google_analytics_id: None,
            yandex_metrika_id: None,
            robots_txt: None,
            custom_head_scripts: None,
        }
    }
}

/// Subset of the settings served to anonymous visitors
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicSettings {
    pub primary_color: String,
    pub secondary_color: String,
    pub accent_color: String,
    pub background_color: String,
    pub text_color: String,
    pub site_name: String,
    pub site_description: String,
    pub logo_url: Option<String>,
    pub hero_image: Option<String>,
    pub footer_navigation: Vec<FooterLink>,
    pub footer_support: Vec<FooterLink>,
    pub footer_legal: Vec<FooterLink>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub seo_keywords: Option<String>,
    pub og_image: Option<String>,
    pub favicon_url: Option<String>,
}

impl From<SiteSettings> for PublicSettings {
    fn from(s: SiteSettings) -> Self {
        Self {
            primary_color: s.primary_color,
            secondary_color: s.secondary_color,
            accent_color: s.accent_color,
            background_color: s.background_color,
            text_color: s.text_color,
            site_name: s.site_name,
            site_description: s.site_description,
            logo_url: s.logo_url,
            hero_image: s.hero_image,
            footer_navigation: s.footer_navigation,
            footer_support: s.footer_support,
            footer_legal: s.footer_legal,
            seo_title: s.seo_title,
            seo_description: s.seo_description,
            seo_keywords: s.seo_keywords,
            og_image: s.og_image,
            favicon_url: s.favicon_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: SiteSettings =
            serde_json::from_str(r##"{"site_name": "Keys4All", "primary_color": "#ff0000"}"##)
                .unwrap();
        assert_eq!(settings.site_name, "Keys4All");
        assert_eq!(settings.primary_color, "#ff0000");
        assert_eq!(settings.text_color, "#ffffff");
        assert_eq!(settings.footer_navigation.len(), 3);
    }

    #[test]
    fn test_public_settings_hide_scripts() {
        let settings = SiteSettings {
            custom_head_scripts: Some("<script>track()</script>".to_string()),
            ..SiteSettings::default()
        };
        let public = serde_json::to_value(PublicSettings::from(settings)).unwrap();
        assert!(public.get("custom_head_scripts").is_none());
        assert_eq!(public["site_name"], "GameHub");
    }
}
