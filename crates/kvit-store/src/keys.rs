//! Path-like entity keys.
//!
//! Every entity lives under its account: `a/<account>/<tag>/<id>` with
//! tag `r` for receipts, `i` for receipt images, `b` for batches and `e`
//! for exports. The layout keeps an account's entities contiguous in key
//! order, so account-scoped work is a prefix scan and deleting an
//! account is a prefix purge.

use std::collections::HashMap;

use crate::error::KeyError;

/// A key that can marshal itself to and from its byte form.
pub trait Key: Sized {
    fn encode(&self) -> Result<Vec<u8>, KeyError>;
    fn decode(raw: &[u8]) -> Result<Self, KeyError>;
}

/// Key for a [`Receipt`](crate::entities::Receipt): `a/<account>/r/<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptKey {
    pub account_id: String,
    pub receipt_id: String,
}

/// Key for a stored receipt [`Image`](crate::entities::Image):
/// `a/<account>/i/<id>`. Shares the receipt id so the pair can be
/// fetched together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageKey {
    pub account_id: String,
    pub receipt_id: String,
}

/// Key for a [`Batch`](crate::entities::Batch): `a/<account>/b/<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchKey {
    pub account_id: String,
    pub batch_id: String,
}

/// Key for an [`Export`](crate::entities::Export): `a/<account>/e/<id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportKey {
    pub account_id: String,
    pub batch_id: String,
}

macro_rules! path_key {
    ($name:ident, $label:literal, $tag:literal, $id_field:ident, $id_name:literal) => {
        impl Key for $name {
            fn encode(&self) -> Result<Vec<u8>, KeyError> {
                if self.account_id.is_empty() {
                    return Err(KeyError::EmptySegment {
                        key: $label,
                        segment: "account ID",
                    });
                }
                if self.$id_field.is_empty() {
                    return Err(KeyError::EmptySegment {
                        key: $label,
                        segment: $id_name,
                    });
                }
                Ok(format!("a/{}/{}/{}", self.account_id, $tag, self.$id_field).into_bytes())
            }

            fn decode(raw: &[u8]) -> Result<Self, KeyError> {
                let pairs = split_key(raw)?;
                let account_id = pairs.get("a").ok_or_else(|| KeyError::MissingSegment {
                    key: $label,
                    segment: "account ID",
                    raw: String::from_utf8_lossy(raw).into_owned(),
                })?;
                let id = pairs.get($tag).ok_or_else(|| KeyError::MissingSegment {
                    key: $label,
                    segment: $id_name,
                    raw: String::from_utf8_lossy(raw).into_owned(),
                })?;
                Ok(Self {
                    account_id: account_id.clone(),
                    $id_field: id.clone(),
                })
            }
        }
    };
}

path_key!(ReceiptKey, "receipt", "r", receipt_id, "receipt ID");
path_key!(ImageKey, "image", "i", receipt_id, "receipt ID");
path_key!(BatchKey, "batch", "b", batch_id, "batch ID");
path_key!(ExportKey, "export", "e", batch_id, "batch ID");

/// Split a raw key like `a/b/c/d` into the pairwise map `a=b, c=d`.
fn split_key(raw: &[u8]) -> Result<HashMap<String, String>, KeyError> {
    let s = String::from_utf8_lossy(raw);
    let elements: Vec<&str> = s.split('/').collect();
    if elements.len() % 2 != 0 {
        return Err(KeyError::Malformed(s.into_owned()));
    }

    let mut out = HashMap::new();
    for pair in elements.chunks_exact(2) {
        out.insert(pair[0].to_string(), pair[1].to_string());
    }
    Ok(out)
}

/// Prefix covering every entity of an account, for account purges.
pub fn account_prefix(account_id: &str) -> Vec<u8> {
    format!("a/{account_id}").into_bytes()
}

/// Prefix covering all receipts of an account.
pub fn receipt_prefix(account_id: &str) -> Vec<u8> {
    format!("a/{account_id}/r/").into_bytes()
}

/// Exclusive upper bound for a prefix range. Keys are ASCII path
/// strings, so a single 0xFF byte sorts after every key in the prefix.
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    end.push(0xFF);
    end
}
