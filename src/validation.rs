//! Form validation for the storefront and console forms.
//!
//! Validators collect every failing field into a [`Validator`] so a form can
//! show all of its errors at once; `finish` turns a non-empty collection into
//! [`AppError::Validation`].

use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{
    CreatePromoCodeRequest, CreateRegionRequest, Discount, LoginRequest, RegisterRequest, ShippingAddress,
    UpdateCardRequest,
};

#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless `ok`. The first failure per field wins.
    pub fn check(&mut self, field: &str, ok: bool, message: &str) -> &mut Self {
        if !ok && !self.errors.contains_key(field) {
            self.errors.insert(field.to_string(), message.to_string());
        }
        self
    }

    pub fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

// ============================================================================
// Field rules
// ============================================================================

pub fn is_email(value: &str) -> bool {
    let value = value.trim();
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.contains(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

pub fn is_strong_password(value: &str) -> bool {
    value.chars().count() >= 8
        && value.chars().any(|c| c.is_alphabetic())
        && value.chars().any(|c| c.is_ascii_digit())
}

fn is_present(value: &str, max: usize) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= max
}

pub fn is_country_code(value: &str) -> bool {
    value.len() == 2 && value.chars().all(|c| c.is_ascii_uppercase())
}

pub fn is_postal_code(value: &str) -> bool {
    let value = value.trim();
    (3..=10).contains(&value.len()) && value.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
}

pub fn is_phone(value: &str) -> bool {
    let value = value.trim();
    let body = value.strip_prefix('+').unwrap_or(value);
    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    (7..=20).contains(&digits) && body.chars().all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
}

/// Google review links must be https and point at a Google property.
pub fn is_google_review_link(value: &str) -> bool {
    let Some(rest) = value.trim().strip_prefix("https://") else {
        return false;
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default().to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    host == "g.page"
        || host == "search.google.com"
        || (host.split('.').next() == Some("google") && host.contains('.'))
}

pub fn is_promo_code(value: &str) -> bool {
    (3..=20).contains(&value.len()) && value.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
}

pub fn is_region_code(value: &str) -> bool {
    (2..=5).contains(&value.len()) && value.chars().all(|c| c.is_ascii_uppercase())
}

pub fn is_card_uid(value: &str) -> bool {
    (4..=32).contains(&value.len()) && value.chars().all(|c| c.is_ascii_hexdigit())
}

// ============================================================================
// Form validators
// ============================================================================

pub fn validate_login(req: &LoginRequest) -> AppResult<()> {
    let mut v = Validator::new();
    v.check("email", is_email(&req.email), "Enter a valid email address")
        .check("password", !req.password.is_empty(), "Password is required");
    v.finish()
}

pub fn validate_registration(req: &RegisterRequest) -> AppResult<()> {
    let mut v = Validator::new();
    v.check("name", is_present(&req.name, 100), "Name is required (max 100 characters)")
        .check("email", is_email(&req.email), "Enter a valid email address")
        .check(
            "password",
            is_strong_password(&req.password),
            "Password needs at least 8 characters with a letter and a digit",
        );
    if let Some(region) = &req.region {
        v.check("region", is_region_code(region), "Unknown region code");
    }
    if let Some(code) = &req.referral_code {
        v.check("referralCode", is_promo_code(code), "Referral code is malformed");
    }
    v.finish()
}

pub fn validate_shipping(address: &ShippingAddress) -> AppResult<()> {
    let mut v = Validator::new();
    v.check("fullName", is_present(&address.full_name, 100), "Recipient name is required")
        .check("line1", is_present(&address.line1, 200), "Street address is required")
        .check("city", is_present(&address.city, 100), "City is required")
        .check("postalCode", is_postal_code(&address.postal_code), "Enter a valid postal code")
        .check("country", is_country_code(&address.country), "Use a two-letter country code")
        .check("phone", is_phone(&address.phone), "Enter a valid phone number");
    v.finish()
}

pub fn validate_card_update(req: &UpdateCardRequest) -> AppResult<()> {
    let mut v = Validator::new();
    if let Some(name) = &req.business_name {
        let len = name.trim().chars().count();
        v.check("businessName", (2..=120).contains(&len), "Business name must be 2-120 characters");
    }
    if let Some(link) = &req.google_review_link {
        v.check(
            "googleReviewLink",
            is_google_review_link(link),
            "Use an https Google review link",
        );
    }
    if req.business_name.is_none() && req.google_review_link.is_none() {
        v.check("businessName", false, "Nothing to update");
    }
    v.finish()
}

pub fn validate_card_uid(uid: &str) -> AppResult<()> {
    let mut v = Validator::new();
    v.check("uid", is_card_uid(uid), "Card UID must be 4-32 hex characters");
    v.finish()
}

pub fn validate_promo_code(req: &CreatePromoCodeRequest) -> AppResult<()> {
    let mut v = Validator::new();
    v.check("code", is_promo_code(&req.code), "Use 3-20 characters of A-Z, 0-9 and '-'");
    match req.discount {
        Discount::Percentage(pct) => {
            v.check("discount", pct > 0.0 && pct <= 100.0, "Percentage must be between 0 and 100");
        }
        Discount::Fixed(amount) => {
            v.check("discount", amount > 0.0, "Fixed discount must be positive");
        }
    }
    if let Some(max) = req.max_usage {
        v.check("maxUsage", max > 0, "Max usage must be at least 1");
    }
    if let (Some(from), Some(until)) = (req.valid_from, req.valid_until) {
        v.check("validUntil", until > from, "End date must be after start date");
    }
    v.finish()
}

pub fn validate_region(req: &CreateRegionRequest) -> AppResult<()> {
    let mut v = Validator::new();
    v.check("name", is_present(&req.name, 100), "Region name is required")
        .check("code", is_region_code(&req.code), "Region code must be 2-5 uppercase letters");
    v.finish()
}
