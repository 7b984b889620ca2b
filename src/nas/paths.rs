//! Canonical NAS folder layout for properties and contacts.
//!
//! Folder names are derived from the entity's current address or name on every
//! call. Renaming a property or contact therefore starts a new folder; files
//! under the old name stay where they are.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use super::error::NasError;
use crate::models::{Contact, Property};

pub const UNKNOWN_STREET: &str = "Unbekannte Straße";
pub const UNKNOWN_CITY: &str = "Unbekannte Stadt";
pub const UNKNOWN_CONTACT: &str = "Unbekannter Kontakt";

/// Route prefix served by the access proxy.
pub const PROXY_PREFIX: &str = "/api/nas/";

/// Characters left alone when encoding a single URL path segment.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyCategory {
    Images,
    ObjectDocuments,
    SensitiveData,
    ContractDocuments,
}

impl PropertyCategory {
    /// Processing order for provisioning and reconciliation.
    pub const ALL: [PropertyCategory; 4] = [
        PropertyCategory::Images,
        PropertyCategory::ObjectDocuments,
        PropertyCategory::SensitiveData,
        PropertyCategory::ContractDocuments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyCategory::Images => "Images",
            PropertyCategory::ObjectDocuments => "ObjectDocuments",
            PropertyCategory::SensitiveData => "SensitiveData",
            PropertyCategory::ContractDocuments => "ContractDocuments",
        }
    }

    pub fn is_images(&self) -> bool {
        matches!(self, PropertyCategory::Images)
    }

    pub fn folder_names() -> Vec<String> {
        Self::ALL.iter().map(|category| category.to_string()).collect()
    }
}

impl fmt::Display for PropertyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyCategory {
    type Err = NasError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PropertyCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| NasError::InvalidInput(format!("unknown property category '{value}'")))
    }
}

/// Business area a contact document belongs to; each has its own NAS tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BusinessModule {
    Realtor,
    Insurance,
    PropertyManagement,
}

impl BusinessModule {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessModule::Realtor => "realtor",
            BusinessModule::Insurance => "insurance",
            BusinessModule::PropertyManagement => "propertyManagement",
        }
    }
}

impl fmt::Display for BusinessModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessModule {
    type Err = NasError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "realtor" => Ok(BusinessModule::Realtor),
            "insurance" => Ok(BusinessModule::Insurance),
            "propertyManagement" => Ok(BusinessModule::PropertyManagement),
            other => Err(NasError::InvalidInput(format!(
                "unknown business module '{other}'"
            ))),
        }
    }
}

/// Normalizes a configured base path to `/a/b` form; the NAS root becomes "".
pub fn normalize_base(base: &str) -> String {
    let trimmed = base.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

pub fn join(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let child = child.trim_matches('/');
    if child.is_empty() {
        return parent.to_string();
    }
    format!("{parent}/{child}")
}

/// One folder name: separators and control characters become `-`.
fn segment(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' => '-',
            ch if ch.is_control() => '-',
            _ => ch,
        })
        .collect()
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn words(parts: &[Option<&str>]) -> String {
    parts
        .iter()
        .flatten()
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `<street> <houseNumber>, <zipCode> <city>` with fallback tokens.
pub fn property_folder_name(property: &Property) -> String {
    let street = present(property.street.as_deref()).unwrap_or(UNKNOWN_STREET);
    let city = present(property.city.as_deref()).unwrap_or(UNKNOWN_CITY);
    let street_part = words(&[Some(street), present(property.house_number.as_deref())]);
    let city_part = words(&[present(property.zip_code.as_deref()), Some(city)]);
    segment(&format!("{street_part}, {city_part}"))
}

pub fn property_folder(base: &str, property: &Property) -> String {
    join(base, &property_folder_name(property))
}

pub fn property_category_path(
    base: &str,
    property: &Property,
    category: PropertyCategory,
) -> String {
    join(&property_folder(base, property), category.as_str())
}

fn contact_name(contact: &Contact) -> String {
    let name = words(&[
        present(contact.first_name.as_deref()),
        present(contact.last_name.as_deref()),
    ]);
    if name.is_empty() {
        UNKNOWN_CONTACT.to_string()
    } else {
        segment(&name)
    }
}

pub fn contact_folder(base: &str, contact: &Contact, module: BusinessModule) -> String {
    match module {
        BusinessModule::Realtor => join(
            base,
            &format!("Consulting/Realtor/Contacts/{}", contact_name(contact)),
        ),
        BusinessModule::Insurance => join(base, &format!("Insurance/{}", contact_name(contact))),
        BusinessModule::PropertyManagement => {
            let street = present(contact.street.as_deref());
            let city = present(contact.city.as_deref());
            let folder = if street.is_none() && city.is_none() {
                contact_name(contact)
            } else {
                let street_part = words(&[
                    Some(street.unwrap_or(UNKNOWN_STREET)),
                    present(contact.house_number.as_deref()),
                ]);
                segment(&format!(
                    "{street_part}, {}",
                    city.unwrap_or(UNKNOWN_CITY)
                ))
            };
            join(base, &format!("PropertyManagement/{folder}"))
        }
    }
}

/// Category (and optional subcategory) below the contact's folder, relative.
pub fn contact_category_dirs(category: &str, subcategory: Option<&str>) -> Vec<String> {
    let category = segment(category);
    let mut dirs = vec![category.clone()];
    if let Some(sub) = present(subcategory) {
        dirs.push(format!("{category}/{}", segment(sub)));
    }
    dirs
}

pub fn contact_category_path(
    base: &str,
    contact: &Contact,
    module: BusinessModule,
    category: &str,
    subcategory: Option<&str>,
) -> String {
    let dirs = contact_category_dirs(category, subcategory);
    let deepest = dirs.last().cloned().unwrap_or_default();
    join(&contact_folder(base, contact, module), &deepest)
}

/// Rejects names that would escape the target folder.
pub fn validate_file_name(name: &str) -> Result<String, NasError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return Err(NasError::InvalidInput("file name must not be empty".into()));
    }
    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(NasError::InvalidInput(format!(
            "file name '{trimmed}' must not contain path separators"
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(NasError::InvalidInput(
            "file name must not contain control characters".into(),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn relative_to_base<'a>(base: &str, remote_path: &'a str) -> &'a str {
    let base = base.trim_end_matches('/');
    let relative = if base.is_empty() {
        remote_path
    } else {
        remote_path
            .strip_prefix(base)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .unwrap_or(remote_path)
    };
    relative.trim_start_matches('/')
}

/// Browser-reachable URL for a remote path, served by the access proxy.
pub fn proxy_url(base: &str, remote_path: &str) -> String {
    let encoded = relative_to_base(base, remote_path)
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| utf8_percent_encode(segment, SEGMENT_ENCODE_SET).to_string())
        .collect::<Vec<_>>()
        .join("/");
    format!("{PROXY_PREFIX}{encoded}")
}

/// Inverse of [`proxy_url`]: decodes the encoded relative path and roots it at
/// `base`. `None` for traversal attempts, invalid UTF-8 or an empty path.
pub fn remote_path_from_proxy(base: &str, encoded: &str) -> Option<String> {
    let mut segments = Vec::new();
    for raw in encoded.split('/').filter(|segment| !segment.is_empty()) {
        let decoded = percent_decode_str(raw).decode_utf8().ok()?.into_owned();
        if decoded == "." || decoded == ".." || decoded.contains('/') || decoded.contains('\\') {
            return None;
        }
        segments.push(decoded);
    }
    if segments.is_empty() {
        return None;
    }
    Some(join(base, &segments.join("/")))
}
