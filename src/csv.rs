use std::{collections::HashMap, hash::Hash};

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Loads a CSV into a HashMap based on the primary key of the type.
/// Rows keep their order of appearance in `order`, so that callers that need
/// deterministic precedence (e.g. substring matching) can iterate in file order.
/// # Error
/// Errors if any row cannot be deserialized into `D`
pub(crate) fn load<H, D, PK>(table: &'static str, data: &[u8], map: PK) -> Result<Table<H, D>>
where
    H: Hash + Eq + Clone,
    D: DeserializeOwned,
    PK: Fn(D) -> (H, D),
{
    let mut rows = HashMap::new();
    let mut order = vec![];
    for record in reader(data).into_deserialize::<D>() {
        let (key, value) = map(record.map_err(|source| Error::Table { table, source })?);
        if rows.insert(key.clone(), value).is_none() {
            order.push(key);
        }
    }
    Ok(Table { rows, order })
}

/// A reader of a CSV with a header row; fields are trimmed
fn reader(data: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(b',')
        .trim(csv::Trim::All)
        .from_reader(data)
}

/// A keyed table that remembers the order in which keys were declared.
#[derive(Debug, Clone)]
pub(crate) struct Table<H, D> {
    rows: HashMap<H, D>,
    order: Vec<H>,
}

impl<H: Hash + Eq, D> Table<H, D> {
    pub fn get(&self, key: &H) -> Option<&D> {
        self.rows.get(key)
    }

    /// Rows in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&H, &D)> {
        self.order
            .iter()
            .filter_map(|key| self.rows.get_key_value(key))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
