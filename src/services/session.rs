use std::collections::HashSet;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ComparisonMode, ComparisonPair, Film, Outcome};
use crate::services::ratings::{BatchItemResult, BatchItemStatus, RatingService};
use crate::services::selector::OpponentSelector;

/// Lifecycle of a comparison session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created; no challengers loaded yet
    Selecting,
    /// Challengers loaded, awaiting resolutions
    Active,
    /// A resolution or batch submission is in flight
    Submitting,
    /// Terminal: no challengers remain or the user finished
    Complete,
}

/// Mode-specific session state
///
/// Sequential and bulk are distinct variants rather than a flag so each
/// mode's invariants (cursor vs pending selections) cannot leak into the
/// other. Pending selections are owned by the session instance; nothing is
/// shared across sessions.
#[derive(Debug, Clone)]
enum ModeState {
    Sequential { cursor: usize },
    Bulk { pending: Vec<(Uuid, Outcome)> },
}

impl ModeState {
    fn new(mode: ComparisonMode) -> Self {
        match mode {
            ComparisonMode::Sequential => ModeState::Sequential { cursor: 0 },
            ComparisonMode::Bulk => ModeState::Bulk {
                pending: Vec::new(),
            },
        }
    }
}

/// One review round: a user ranking a target film against challengers
///
/// The session is transient: it holds no durable state of its own, and only
/// the comparisons it resolves survive (as history entries and rating
/// updates). Abandoning a session at any point requires no cleanup.
///
/// All mutating operations take `&mut self`, so a single session instance
/// serializes its own submissions; the `Submitting` state additionally
/// rejects re-entrant resolutions when the caller shares the session.
pub struct ComparisonSession {
    user_id: Uuid,
    target_film_id: Uuid,
    ratings: RatingService,
    selector: OpponentSelector,
    state: SessionState,
    mode: ModeState,
    challengers: Vec<Film>,
    resolved: HashSet<Uuid>,
    page_size: usize,
    max_challengers: usize,
}

impl ComparisonSession {
    pub fn new(
        ratings: RatingService,
        selector: OpponentSelector,
        user_id: Uuid,
        target_film_id: Uuid,
        mode: ComparisonMode,
        page_size: usize,
        max_challengers: usize,
    ) -> Self {
        Self {
            user_id,
            target_film_id,
            ratings,
            selector,
            state: SessionState::Selecting,
            mode: ModeState::new(mode),
            challengers: Vec::new(),
            resolved: HashSet::new(),
            page_size,
            max_challengers,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> ComparisonMode {
        match self.mode {
            ModeState::Sequential { .. } => ComparisonMode::Sequential,
            ModeState::Bulk { .. } => ComparisonMode::Bulk,
        }
    }

    pub fn challengers(&self) -> &[Film] {
        &self.challengers
    }

    /// The challenger currently shown, in sequential mode
    pub fn current_challenger(&self) -> Option<&Film> {
        match &self.mode {
            ModeState::Sequential { cursor } => self.challengers.get(*cursor),
            ModeState::Bulk { .. } => None,
        }
    }

    /// Staged selections, in insertion order (bulk mode)
    pub fn pending_selections(&self) -> &[(Uuid, Outcome)] {
        match &self.mode {
            ModeState::Bulk { pending } => pending,
            ModeState::Sequential { .. } => &[],
        }
    }

    /// Loads the next page of challengers, up to the session ceiling
    ///
    /// The working set only grows; previously loaded films are passed back to
    /// the selector as exclusions. Returns how many challengers were added.
    /// An empty first load completes the session immediately.
    pub async fn load_challengers(&mut self) -> AppResult<usize> {
        match self.state {
            SessionState::Selecting | SessionState::Active => {}
            SessionState::Submitting => {
                return Err(AppError::Validation(
                    "a submission is in flight".to_string(),
                ))
            }
            SessionState::Complete => {
                return Err(AppError::Validation("session is complete".to_string()))
            }
        }

        let remaining = self.max_challengers.saturating_sub(self.challengers.len());
        let limit = self.page_size.min(remaining);

        let added = if limit == 0 {
            0
        } else {
            let loaded: HashSet<Uuid> = self.challengers.iter().map(|f| f.id).collect();
            let page = self
                .selector
                .select_challengers(self.user_id, self.target_film_id, &loaded, limit)
                .await?;
            let added = page.len();
            self.challengers.extend(page);
            added
        };

        if self.state == SessionState::Selecting {
            self.state = if self.challengers.is_empty() {
                SessionState::Complete
            } else {
                SessionState::Active
            };
        }

        tracing::debug!(
            user_id = %self.user_id,
            target_film = %self.target_film_id,
            added,
            total = self.challengers.len(),
            "Loaded challengers"
        );

        Ok(added)
    }

    /// Resolves the currently shown comparison (sequential mode)
    ///
    /// Rejected while another submission is in flight. On success the cursor
    /// advances; walking past the last challenger completes the session. On
    /// failure the session returns to `Active` and the same comparison can be
    /// retried.
    pub async fn resolve(&mut self, outcome: Outcome) -> AppResult<ComparisonPair> {
        self.ensure_active()?;
        let cursor = match &self.mode {
            ModeState::Sequential { cursor } => *cursor,
            ModeState::Bulk { .. } => {
                return Err(AppError::Validation(
                    "resolve is only available in sequential mode".to_string(),
                ))
            }
        };

        let challenger_id = self
            .challengers
            .get(cursor)
            .map(|f| f.id)
            .ok_or_else(|| AppError::Validation("no challenger to resolve".to_string()))?;

        self.state = SessionState::Submitting;
        let result = outcome.into_contest_result(self.target_film_id, challenger_id);
        let applied = self
            .ratings
            .compare_one(self.user_id, self.target_film_id, challenger_id, result)
            .await;

        match applied {
            Ok(pair) => {
                self.resolved.insert(challenger_id);
                let next = cursor + 1;
                self.mode = ModeState::Sequential { cursor: next };
                self.state = if next >= self.challengers.len() {
                    SessionState::Complete
                } else {
                    SessionState::Active
                };
                Ok(pair)
            }
            Err(e) => {
                self.state = SessionState::Active;
                Err(e)
            }
        }
    }

    /// Stages or overwrites a selection (bulk mode)
    ///
    /// Purely local until submission; overwriting keeps the selection's
    /// original position in the submission order.
    pub fn set_selection(&mut self, film_id: Uuid, outcome: Outcome) -> AppResult<()> {
        self.ensure_active()?;
        if !self.challengers.iter().any(|f| f.id == film_id) {
            return Err(AppError::Validation(format!(
                "film {} is not among the loaded challengers",
                film_id
            )));
        }

        match &mut self.mode {
            ModeState::Bulk { pending } => {
                if let Some(slot) = pending.iter_mut().find(|(id, _)| *id == film_id) {
                    slot.1 = outcome;
                } else {
                    pending.push((film_id, outcome));
                }
                Ok(())
            }
            ModeState::Sequential { .. } => Err(AppError::Validation(
                "selections are only available in bulk mode".to_string(),
            )),
        }
    }

    /// Removes a staged selection (bulk mode)
    pub fn remove_selection(&mut self, film_id: Uuid) -> AppResult<()> {
        self.ensure_active()?;
        match &mut self.mode {
            ModeState::Bulk { pending } => {
                pending.retain(|(id, _)| *id != film_id);
                Ok(())
            }
            ModeState::Sequential { .. } => Err(AppError::Validation(
                "selections are only available in bulk mode".to_string(),
            )),
        }
    }

    /// Submits all staged selections in insertion order (bulk mode)
    ///
    /// Applied and skipped items leave the pending set; failed items stay
    /// staged so the caller retries only those. The session completes once
    /// every loaded challenger is resolved and nothing is pending.
    pub async fn submit_batch(&mut self) -> AppResult<Vec<BatchItemResult>> {
        self.ensure_active()?;
        let items = match &self.mode {
            ModeState::Bulk { pending } if pending.is_empty() => {
                return Err(AppError::Validation(
                    "no selections staged for submission".to_string(),
                ))
            }
            ModeState::Bulk { pending } => pending.clone(),
            ModeState::Sequential { .. } => {
                return Err(AppError::Validation(
                    "batch submission is only available in bulk mode".to_string(),
                ))
            }
        };

        self.state = SessionState::Submitting;
        let results = match self
            .ratings
            .compare_batch(self.user_id, self.target_film_id, &items)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                self.state = SessionState::Active;
                return Err(e);
            }
        };

        let settled: HashSet<Uuid> = results
            .iter()
            .filter(|r| {
                !matches!(r.status, BatchItemStatus::Failed { .. })
            })
            .map(|r| r.challenger_film_id)
            .collect();
        self.resolved.extend(settled.iter().copied());

        let pending_empty = match &mut self.mode {
            ModeState::Bulk { pending } => {
                pending.retain(|(id, _)| !settled.contains(id));
                pending.is_empty()
            }
            ModeState::Sequential { .. } => unreachable!(),
        };

        let all_resolved = self
            .challengers
            .iter()
            .all(|f| self.resolved.contains(&f.id));
        self.state = if pending_empty && all_resolved {
            SessionState::Complete
        } else {
            SessionState::Active
        };

        Ok(results)
    }

    /// Switches between sequential and bulk mode
    ///
    /// Allowed only while active with nothing staged; resets the cursor and
    /// pending selections but keeps the loaded challengers (no re-fetch).
    pub fn toggle_mode(&mut self) -> AppResult<ComparisonMode> {
        self.ensure_active()?;
        let new_mode = match &self.mode {
            ModeState::Bulk { pending } if !pending.is_empty() => {
                return Err(AppError::Validation(
                    "cannot switch modes with staged selections".to_string(),
                ))
            }
            ModeState::Bulk { .. } => ComparisonMode::Sequential,
            ModeState::Sequential { .. } => ComparisonMode::Bulk,
        };
        self.mode = ModeState::new(new_mode);
        Ok(new_mode)
    }

    fn ensure_active(&self) -> AppResult<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Submitting => Err(AppError::Validation(
                "a submission is in flight".to_string(),
            )),
            SessionState::Selecting => Err(AppError::Validation(
                "challengers have not been loaded yet".to_string(),
            )),
            SessionState::Complete => {
                Err(AppError::Validation("session is complete".to_string()))
            }
        }
    }
}
