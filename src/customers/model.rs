//! Customer records, inputs and validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{CustomerError, CustomerResult};
use crate::cache::Pagination;

pub const NAME_MIN_CHARS: usize = 3;
pub const NAME_MAX_CHARS: usize = 200;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const SORT_FIELDS: [&str; 3] = ["name", "tax_id", "email"];

const TAX_ID_DIGITS: usize = 11;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    /// Eleven digits, no punctuation.
    pub tax_id: String,
    /// Lowercased.
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// Builds a new record from validated input.
    pub fn create(input: ValidCustomer) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            tax_id: input.tax_id,
            email: input.email,
            created_at: Utc::now(),
            modified_at: None,
        }
    }

    pub fn replace(&mut self, input: ValidCustomer) {
        self.name = input.name;
        self.tax_id = input.tax_id;
        self.email = input.email;
        self.modified_at = Some(Utc::now());
    }
}

/// Body of create and full-update requests.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NewCustomer {
    pub name: String,
    pub tax_id: String,
    pub email: String,
}

impl NewCustomer {
    pub fn validate(&self) -> CustomerResult<ValidCustomer> {
        Ok(ValidCustomer {
            name: normalize_name(&self.name)?,
            tax_id: normalize_tax_id(&self.tax_id)?,
            email: normalize_email(&self.email)?,
        })
    }
}

/// Normalized, validated customer fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCustomer {
    pub name: String,
    pub tax_id: String,
    pub email: String,
}

/// Partial update. Absent or blank fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
}

impl CustomerPatch {
    /// Applies the provided fields to `current`, returning the merged, validated result.
    pub fn merge(&self, current: &Customer) -> CustomerResult<ValidCustomer> {
        Ok(ValidCustomer {
            name: match non_blank(&self.name) {
                Some(name) => normalize_name(name)?,
                None => current.name.clone(),
            },
            tax_id: match non_blank(&self.tax_id) {
                Some(tax_id) => normalize_tax_id(tax_id)?,
                None => current.tax_id.clone(),
            },
            email: match non_blank(&self.email) {
                Some(email) => normalize_email(email)?,
                None => current.email.clone(),
            },
        })
    }

    pub fn is_empty(&self) -> bool {
        non_blank(&self.name).is_none()
            && non_blank(&self.tax_id).is_none()
            && non_blank(&self.email).is_none()
    }
}

/// Search predicates. Name matches by case-insensitive substring; tax id and email exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomerFilter {
    pub name: Option<String>,
    pub tax_id: Option<String>,
    pub email: Option<String>,
}

impl CustomerFilter {
    /// Trims every field, drops blank ones, lowercases the name and normalizes tax id and email.
    pub fn normalize(&self) -> CustomerResult<Self> {
        Ok(Self {
            name: non_blank(&self.name).map(str::to_lowercase),
            tax_id: non_blank(&self.tax_id).map(normalize_tax_id).transpose()?,
            email: non_blank(&self.email).map(normalize_email).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.tax_id.is_none() && self.email.is_none()
    }

    /// `(field, value)` pairs for search-key hashing.
    pub fn as_pairs(&self) -> [(&'static str, Option<&str>); 3] {
        [
            ("name", self.name.as_deref()),
            ("tax_id", self.tax_id.as_deref()),
            ("email", self.email.as_deref()),
        ]
    }

    pub fn matches(&self, customer: &Customer) -> bool {
        let name_ok = self.name.as_ref().is_none_or(|name| {
            customer
                .name
                .to_lowercase()
                .contains(&name.to_lowercase())
        });
        let tax_id_ok = self
            .tax_id
            .as_ref()
            .is_none_or(|tax_id| &customer.tax_id == tax_id);
        let email_ok = self
            .email
            .as_ref()
            .is_none_or(|email| &customer.email == email);
        name_ok && tax_id_ok && email_ok
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: &Pagination, total_count: usize) -> Self {
        let size = pagination.page_size.max(1) as usize;
        Self {
            items,
            page: pagination.page,
            page_size: pagination.page_size,
            total_count,
            total_pages: total_count.div_ceil(size),
        }
    }
}

/// Rejects page 0, page sizes outside `1..=100` and unknown sort fields.
pub fn validate_pagination(pagination: &Pagination) -> CustomerResult<()> {
    if pagination.page == 0 {
        return Err(CustomerError::validation("page", "must be at least 1"));
    }
    if pagination.page_size == 0 || pagination.page_size > MAX_PAGE_SIZE {
        return Err(CustomerError::validation(
            "page_size",
            format!("must be between 1 and {}", MAX_PAGE_SIZE),
        ));
    }
    if let Some(sort) = pagination.sort_by.as_deref().map(str::trim)
        && !sort.is_empty()
        && !SORT_FIELDS.contains(&sort.to_lowercase().as_str())
    {
        return Err(CustomerError::validation(
            "sort_by",
            format!("must be one of {}", SORT_FIELDS.join(", ")),
        ));
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_name(name: &str) -> CustomerResult<String> {
    let name = name.trim();
    let chars = name.chars().count();
    if chars < NAME_MIN_CHARS || chars > NAME_MAX_CHARS {
        return Err(CustomerError::validation(
            "name",
            format!(
                "must be between {} and {} characters",
                NAME_MIN_CHARS, NAME_MAX_CHARS
            ),
        ));
    }
    Ok(name.to_string())
}

/// Strips punctuation and verifies the two check digits.
pub fn normalize_tax_id(tax_id: &str) -> CustomerResult<String> {
    let digits: Vec<u32> = tax_id
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .map(|c| c.to_digit(10))
        .collect::<Option<_>>()
        .ok_or_else(|| CustomerError::validation("tax_id", "must contain only digits"))?;

    if digits.len() != TAX_ID_DIGITS {
        return Err(CustomerError::validation("tax_id", "must have 11 digits"));
    }
    if digits.iter().all(|d| *d == digits[0]) {
        return Err(CustomerError::validation("tax_id", "is not a valid number"));
    }

    let check = |len: usize| -> u32 {
        let weight_start = len as u32 + 1;
        let sum: u32 = digits[..len]
            .iter()
            .enumerate()
            .map(|(i, d)| d * (weight_start - i as u32))
            .sum();
        (sum * 10) % 11 % 10
    };
    if check(9) != digits[9] || check(10) != digits[10] {
        return Err(CustomerError::validation("tax_id", "is not a valid number"));
    }

    Ok(digits
        .iter()
        .filter_map(|d| char::from_digit(*d, 10))
        .collect())
}

/// Trims, lowercases and checks the `local@domain.tld` shape.
pub fn normalize_email(email: &str) -> CustomerResult<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(CustomerError::validation("email", "is not a valid address"));
    }
    Ok(email)
}
