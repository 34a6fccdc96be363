use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{RekapError, Result};
use crate::models::{Category, NewCategory, NewTransaction, ParsedRow};
use crate::store::Store;

pub const DEFAULT_PALETTE: &[&str] = &[
    "#ef4444", "#f97316", "#eab308", "#22c55e", "#14b8a6", "#3b82f6", "#8b5cf6", "#ec4899",
];

// ---------------------------------------------------------------------------
// Colour strategies
// ---------------------------------------------------------------------------

/// Picks the colour for each category the import creates.
pub trait ColorStrategy {
    fn next_color(&mut self) -> String;
}

/// Uniform random pick from the palette.
pub struct RandomPalette {
    palette: Vec<String>,
    rng: StdRng,
}

impl RandomPalette {
    pub fn new(palette: Vec<String>) -> Self {
        Self {
            palette,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(palette: Vec<String>, seed: u64) -> Self {
        Self {
            palette,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ColorStrategy for RandomPalette {
    fn next_color(&mut self) -> String {
        self.palette
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_PALETTE[0].to_string())
    }
}

/// Walks the palette in order, wrapping around.
pub struct CyclingPalette {
    palette: Vec<String>,
    next: usize,
}

impl CyclingPalette {
    pub fn new(palette: Vec<String>) -> Self {
        Self { palette, next: 0 }
    }
}

impl ColorStrategy for CyclingPalette {
    fn next_color(&mut self) -> String {
        if self.palette.is_empty() {
            return DEFAULT_PALETTE[0].to_string();
        }
        let color = self.palette[self.next % self.palette.len()].clone();
        self.next += 1;
        color
    }
}

pub fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Category index
// ---------------------------------------------------------------------------

/// Case-insensitive category name → id lookup for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryIndex {
    ids: HashMap<String, i64>,
}

impl CategoryIndex {
    pub fn from_categories(categories: &[Category]) -> Self {
        categories
            .iter()
            .fold(Self::default(), |index, c| index.with(&c.name, c.id))
    }

    /// The index extended by one entry. An existing entry for the name is kept.
    pub fn with(mut self, name: &str, id: i64) -> Self {
        self.ids.entry(name.to_lowercase()).or_insert(id);
        self
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.ids.get(&name.to_lowercase()).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(&name.to_lowercase())
    }

    /// Turn parsed rows into creation requests. Every row's category must be indexed.
    pub fn resolve(&self, rows: &[ParsedRow]) -> Result<Vec<NewTransaction>> {
        rows.iter()
            .map(|row| {
                let category_id = self
                    .get(&row.category_name)
                    .ok_or_else(|| RekapError::UnknownCategory(row.category_name.clone()))?;
                Ok(NewTransaction {
                    category_id,
                    date: row.date,
                    description: row.description.clone(),
                    amount: row.amount,
                    kind: row.kind,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Lower-cased category names used by `rows` that `existing` lacks, in
/// first-seen order, without duplicates.
pub fn new_category_names(rows: &[ParsedRow], existing: &[Category]) -> Vec<String> {
    let known: HashSet<String> = existing.iter().map(|c| c.name.to_lowercase()).collect();
    let mut seen = HashSet::new();
    rows.iter()
        .map(|row| row.category_name.to_lowercase())
        .filter(|name| !known.contains(name) && seen.insert(name.clone()))
        .collect()
}

/// Upper-case the first letter of every word, lower-case the rest. Spacing is kept.
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut word_start = true;
    for c in name.chars() {
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = c.is_whitespace();
    }
    out
}

/// Title-cased name for a new category, unless title-casing would change
/// its case-insensitive key (`ß` upper-cases to `SS`), in which case the
/// lower-cased name is kept so later lookups still find it.
fn display_name(key: &str) -> String {
    let titled = title_case(key);
    if titled.to_lowercase() == key {
        titled
    } else {
        key.to_string()
    }
}

/// Categories the import has to create. A new category takes its type from
/// the first row that mentions it.
pub fn plan(
    rows: &[ParsedRow],
    existing: &[Category],
    colors: &mut dyn ColorStrategy,
) -> Vec<NewCategory> {
    new_category_names(rows, existing)
        .into_iter()
        .filter_map(|name| {
            let first = rows.iter().find(|r| r.category_name.to_lowercase() == name)?;
            Some(NewCategory {
                name: display_name(&name),
                kind: first.kind,
                color: colors.next_color(),
                is_default: false,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub index: CategoryIndex,
    pub created: Vec<Category>,
}

/// Create the planned categories one at a time, threading the index through
/// each step so a name is created at most once. The first failure aborts the
/// pass; nothing after it is attempted.
pub fn create_categories<S: Store + ?Sized>(
    store: &S,
    user_id: i64,
    existing: &[Category],
    planned: Vec<NewCategory>,
) -> Result<Reconciled> {
    let start = Reconciled {
        index: CategoryIndex::from_categories(existing),
        created: Vec::new(),
    };
    planned.into_iter().try_fold(start, |acc, new| {
        if acc.index.contains(&new.name) {
            return Ok(acc);
        }
        let category = store
            .create_category(user_id, &new)
            .map_err(|e| RekapError::Reconciliation {
                name: new.name.clone(),
                source: Box::new(e),
            })?;
        tracing::info!(name = %category.name, id = category.id, kind = %category.kind, "created category");
        let Reconciled { index, mut created } = acc;
        let index = index.with(&category.name, category.id);
        created.push(category);
        Ok(Reconciled { index, created })
    })
}

/// Plan and create in one go, returning the transaction requests for `rows`.
pub fn reconcile<S: Store + ?Sized>(
    store: &S,
    user_id: i64,
    rows: &[ParsedRow],
    existing: &[Category],
    colors: &mut dyn ColorStrategy,
) -> Result<(Reconciled, Vec<NewTransaction>)> {
    let planned = plan(rows, existing, colors);
    let reconciled = create_categories(store, user_id, existing, planned)?;
    let requests = reconciled.index.resolve(rows)?;
    Ok((reconciled, requests))
}
