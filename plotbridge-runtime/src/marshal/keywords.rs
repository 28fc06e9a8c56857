//! Keyword arguments - string maps to runtime dicts
//!
//! Free-form options travel as `Keywords` (string → string). Values are
//! passed through as runtime strings unless the callable's coercion table
//! names the key; the table is data, never a scattered conditional.

use super::convert::ToForeign;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::refs::{Borrowed, Owned};
use std::collections::BTreeMap;

/// Free-form keyword options. Keys are unique; order is irrelevant to the runtime.
pub type Keywords = BTreeMap<String, String>;

/// How a keyword value is interpreted before it reaches the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Coercion {
    #[default]
    Str,
    Float,
    Int,
    /// `"True"` is true; anything else is false
    Bool,
}

/// Per-callable key overrides; keys not listed are [`Coercion::Str`]
pub type CoercionTable = &'static [(&'static str, Coercion)];

/// Build [`Keywords`] from pairs
///
/// ```
/// use plotbridge_runtime::marshal::keywords;
/// let kw = keywords([("label", "cos"), ("color", "red")]);
/// assert_eq!(kw["label"], "cos");
/// ```
pub fn keywords<I, K, V>(pairs: I) -> Keywords
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Look up the coercion for `key`
pub fn coercion_for(table: CoercionTable, key: &str) -> Coercion {
    table
        .iter()
        .find(|(name, _)| *name == key)
        .map(|&(_, coercion)| coercion)
        .unwrap_or_default()
}

fn coerce<'h>(host: &'h dyn Host, key: &str, value: &str, coercion: Coercion) -> Result<Owned<'h>> {
    let failed = || Error::KeywordCoercion {
        key: key.to_string(),
        value: value.to_string(),
        expected: coercion,
    };
    match coercion {
        Coercion::Str => value.to_foreign(host),
        Coercion::Float => value.trim().parse::<f64>().map_err(|_| failed())?.to_foreign(host),
        Coercion::Int => value.trim().parse::<i64>().map_err(|_| failed())?.to_foreign(host),
        Coercion::Bool => (value == "True").to_foreign(host),
    }
}

/// Incrementally filled runtime dict.
///
/// Dict insertion does not steal, so each inserted value's own reference is
/// released right after the dict has taken one.
pub struct DictBuilder<'h> {
    host: &'h dyn Host,
    dict: Owned<'h>,
}

impl<'h> DictBuilder<'h> {
    pub(crate) fn new(host: &'h dyn Host) -> Result<Self> {
        let dict = Owned::adopt(host, host.new_dict(), "creating a keyword dict")?;
        Ok(Self { host, dict })
    }

    /// `dict[key] = value`, converting `value`
    pub fn set<T: ToForeign + ?Sized>(&mut self, key: &str, value: &T) -> Result<&mut Self> {
        let value = value.to_foreign(self.host)?;
        self.set_object(key, value.borrow())
    }

    /// `dict[key] = obj` for an existing runtime object
    pub fn set_object(&mut self, key: &str, obj: Borrowed<'_, 'h>) -> Result<&mut Self> {
        if !self.host.dict_set_item(self.dict.raw(), key, obj.raw()) {
            return Err(Error::invalid_handle(
                format!("storing keyword `{}`", key),
                self.host.take_error(),
            ));
        }
        Ok(self)
    }

    /// Insert every pair of `keywords`, coercing per `table`
    pub fn extend(&mut self, keywords: &Keywords, table: CoercionTable) -> Result<&mut Self> {
        for (key, value) in keywords {
            let value = coerce(self.host, key, value, coercion_for(table, key))?;
            self.set_object(key, value.borrow())?;
        }
        Ok(self)
    }

    pub fn finish(self) -> Owned<'h> {
        self.dict
    }
}
