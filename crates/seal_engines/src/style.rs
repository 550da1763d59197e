#![forbid(unsafe_code)]

use crate::font::UnicodeFonts;

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn components(self) -> [f32; 3] {
        [
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditTrailLabels {
    pub title: &'static str,
    pub envelope_id: &'static str,
    pub verify: &'static str,
    pub original_sha256: &'static str,
    pub result_sha256: &'static str,
    pub generated_at: &'static str,
    pub email_verification: &'static str,
    pub phone_verification: &'static str,
    pub verified: &'static str,
    pub ip: &'static str,
    pub session_id: &'static str,
    pub user_agent: &'static str,
    pub event_log: &'static str,
    pub paid: &'static str,
    pub not_available: &'static str,
    pub field: &'static str,
    pub to: &'static str,
    pub by: &'static str,
}

/// Presentation constants for the audit trail. Built once and injected into the
/// composer and renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditTrailStyle {
    pub product_name: &'static str,
    pub product_url: &'static str,
    pub sign_reason: &'static str,
    pub labels: AuditTrailLabels,
    pub font_size: f32,
    pub title_font_size: f32,
    pub subtitle_font_size: f32,
    pub section_title_font_size: f32,
    pub line_spacing: f32,
    pub box_line_spacing: f32,
    pub text_color: Rgb,
    pub link_color: Rgb,
    pub divider_color: Rgb,
    pub band_color: Rgb,
    pub band_height: f32,
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub cell_padding_bottom: f32,
    pub divider_margin_bottom: f32,
    pub max_image_px: u32,
    pub image_width: f32,
    pub initials_width: f32,
    pub currency_symbols: &'static [(&'static str, &'static str)],
    pub default_date_format: &'static str,
    /// Faces for text outside WinAnsi. `None` rejects such text.
    pub unicode_fonts: Option<UnicodeFonts>,
}

impl AuditTrailStyle {
    pub fn mvp_v1() -> Self {
        Self {
            product_name: "Sasana",
            product_url: "https://www.sasana.example",
            sign_reason: "Signed with Sasana E Signature",
            labels: AuditTrailLabels {
                title: "Audit Log",
                envelope_id: "Envelope ID",
                verify: "Verify",
                original_sha256: "Original SHA256",
                result_sha256: "Result SHA256",
                generated_at: "Generated at",
                email_verification: "Email verification",
                phone_verification: "Phone verification",
                verified: "Verified",
                ip: "IP",
                session_id: "Session ID",
                user_agent: "User agent",
                event_log: "Event Log",
                paid: "Paid",
                not_available: "n/a",
                field: "Field",
                to: "to",
                by: "by",
            },
            font_size: 9.0,
            title_font_size: 16.0,
            subtitle_font_size: 12.0,
            section_title_font_size: 12.0,
            line_spacing: 1.2,
            box_line_spacing: 1.8,
            text_color: Rgb(0x52, 0x52, 0x52),
            link_color: Rgb(0x1d, 0x4e, 0xd8),
            divider_color: Rgb(0xd9, 0xd9, 0xd9),
            band_color: Rgb(0xfa, 0xf7, 0xf5),
            band_height: 20.0,
            page_width: 595.28,
            page_height: 841.89,
            margin: 50.0,
            cell_padding_bottom: 25.0,
            divider_margin_bottom: 15.0,
            max_image_px: 600,
            image_width: 200.0,
            initials_width: 100.0,
            currency_symbols: &[("USD", "$"), ("EUR", "€"), ("GBP", "£")],
            default_date_format: "MM/DD/YYYY",
            unicode_fonts: Some(UnicodeFonts::dejavu_sans()),
        }
    }

    pub fn currency_symbol(&self, code: &str) -> Option<&'static str> {
        self.currency_symbols
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, s)| *s)
    }

    /// `/Creator` value of the rendered document.
    pub fn creator(&self) -> String {
        format!("{} ({})", self.product_name, self.product_url)
    }

    pub fn content_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }
}
