use crate::error::{RekapError, Result};
use crate::importer::{parse_file, ParseOutcome};
use crate::models::ParsedRow;
use crate::reconciler::{self, ColorStrategy};
use crate::store::Store;

/// Parsed data held between upload and commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Staged {
    pub file_name: String,
    pub rows: Vec<ParsedRow>,
    /// Row-level problems; shown, never blocking.
    pub warnings: Vec<String>,
    /// Lower-cased category names that will be created on commit.
    pub new_categories: Vec<String>,
    /// Why the last commit attempt failed, if it did.
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub transactions_imported: usize,
    pub categories_created: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportState {
    Upload { error: Option<String> },
    Preview(Staged),
    Importing(Staged),
    Done(ImportSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Upload,
    Preview,
    Importing,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportEvent {
    Parsed {
        file_name: String,
        outcome: ParseOutcome,
        new_categories: Vec<String>,
    },
    ParseFailed(String),
    Back,
    Confirm,
    Committed(ImportSummary),
    Failed(String),
    Close,
}

/// Work the caller has to perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Commit(Vec<ParsedRow>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: ImportState,
    pub effect: Option<Effect>,
}

impl Step {
    fn stay(state: ImportState) -> Self {
        Self {
            state,
            effect: None,
        }
    }
}

impl Default for ImportState {
    fn default() -> Self {
        Self::Upload { error: None }
    }
}

impl ImportState {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Upload { .. } => Phase::Upload,
            Self::Preview(_) => Phase::Preview,
            Self::Importing(_) => Phase::Importing,
            Self::Done(_) => Phase::Done,
        }
    }

    /// Pure transition function. Events that make no sense in the current
    /// state leave it untouched, which is also how a second `Confirm` while
    /// importing is ignored.
    pub fn next(self, event: ImportEvent) -> Step {
        match (self, event) {
            (Self::Importing(_), ImportEvent::Committed(summary)) => Step::stay(Self::Done(summary)),
            (Self::Importing(mut staged), ImportEvent::Failed(error)) => {
                staged.last_error = Some(error);
                Step::stay(Self::Preview(staged))
            }
            (state @ Self::Importing(_), _) => Step::stay(state),

            (_, ImportEvent::Close) => Step::stay(Self::default()),

            (
                Self::Upload { .. },
                ImportEvent::Parsed {
                    file_name,
                    outcome,
                    new_categories,
                },
            ) => Step::stay(Self::Preview(Staged {
                file_name,
                rows: outcome.rows,
                warnings: outcome.errors,
                new_categories,
                last_error: None,
            })),
            (Self::Upload { .. }, ImportEvent::ParseFailed(error)) => {
                Step::stay(Self::Upload { error: Some(error) })
            }

            (Self::Preview(_), ImportEvent::Back) => Step::stay(Self::default()),
            (Self::Preview(mut staged), ImportEvent::Confirm) => {
                staged.last_error = None;
                let rows = staged.rows.clone();
                Step {
                    state: Self::Importing(staged),
                    effect: Some(Effect::Commit(rows)),
                }
            }

            (state, _) => Step::stay(state),
        }
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Runs one staged import against a store. Front ends render `state()` and
/// forward user actions; every write happens inside `confirm`.
pub struct Importer<'a, S: Store + ?Sized> {
    store: &'a S,
    user_id: i64,
    colors: Box<dyn ColorStrategy + 'a>,
    state: ImportState,
}

impl<'a, S: Store + ?Sized> Importer<'a, S> {
    pub fn new(store: &'a S, user_id: i64, colors: Box<dyn ColorStrategy + 'a>) -> Self {
        Self {
            store,
            user_id,
            colors,
            state: ImportState::default(),
        }
    }

    pub fn state(&self) -> &ImportState {
        &self.state
    }

    fn apply(&mut self, event: ImportEvent) -> Option<Effect> {
        let state = std::mem::take(&mut self.state);
        let step = state.next(event);
        self.state = step.state;
        step.effect
    }

    /// Parse a file and move to the preview. Ignored outside the upload step.
    pub fn select_file(&mut self, file_name: &str, bytes: &[u8]) {
        if self.state.phase() != Phase::Upload {
            return;
        }
        let event = match self.stage(file_name, parse_file(file_name, bytes)) {
            Ok(event) => event,
            Err(e) if e.is_structural() => {
                tracing::warn!(file = file_name, error = %e, "import file rejected");
                ImportEvent::ParseFailed(e.to_string())
            }
            Err(e) => {
                tracing::error!(file = file_name, error = %e, "could not stage import");
                ImportEvent::ParseFailed(e.to_string())
            }
        };
        self.apply(event);
    }

    /// Stage rows that came from somewhere other than a spreadsheet, such as
    /// a scanned receipt.
    pub fn stage_rows(&mut self, source: &str, rows: Vec<ParsedRow>) {
        if self.state.phase() != Phase::Upload {
            return;
        }
        let outcome = ParseOutcome {
            rows,
            errors: Vec::new(),
        };
        let event = match self.stage(source, Ok(outcome)) {
            Ok(event) => event,
            Err(e) => ImportEvent::ParseFailed(e.to_string()),
        };
        self.apply(event);
    }

    fn stage(&self, file_name: &str, parsed: Result<ParseOutcome>) -> Result<ImportEvent> {
        let outcome = parsed?;
        if outcome.rows.is_empty() {
            return Err(RekapError::NoValidRows(outcome.errors));
        }
        let existing = self.store.list_categories(self.user_id)?;
        let new_categories = reconciler::new_category_names(&outcome.rows, &existing);
        Ok(ImportEvent::Parsed {
            file_name: file_name.to_string(),
            outcome,
            new_categories,
        })
    }

    pub fn back(&mut self) {
        self.apply(ImportEvent::Back);
    }

    pub fn close(&mut self) {
        self.apply(ImportEvent::Close);
    }

    /// Commit the previewed rows. `None` when there was nothing to confirm
    /// (not in preview, or a commit is already running).
    pub fn confirm(&mut self) -> Option<Result<ImportSummary>> {
        let Effect::Commit(rows) = self.apply(ImportEvent::Confirm)?;
        let result = commit(self.store, self.user_id, &rows, self.colors.as_mut());
        let event = match &result {
            Ok(summary) => ImportEvent::Committed(summary.clone()),
            Err(e) => ImportEvent::Failed(e.to_string()),
        };
        self.apply(event);
        Some(result)
    }
}

/// Reconcile categories, then store every row with a single bulk call.
/// Categories created before a failed bulk call are left in place.
pub fn commit<S: Store + ?Sized>(
    store: &S,
    user_id: i64,
    rows: &[ParsedRow],
    colors: &mut dyn ColorStrategy,
) -> Result<ImportSummary> {
    let existing = store.list_categories(user_id)?;
    let (reconciled, requests) = reconciler::reconcile(store, user_id, rows, &existing, colors)?;

    let created = store
        .create_transactions_bulk(user_id, &requests)
        .map_err(|e| {
            if !reconciled.created.is_empty() {
                tracing::warn!(
                    orphaned = reconciled.created.len(),
                    "bulk create failed after categories were created"
                );
            }
            RekapError::Commit(Box::new(e))
        })?;

    tracing::info!(
        user_id,
        transactions = created.len(),
        categories = reconciled.created.len(),
        "import committed; transaction and category views are stale"
    );

    Ok(ImportSummary {
        transactions_imported: created.len(),
        categories_created: reconciled.created.into_iter().map(|c| c.name).collect(),
    })
}
