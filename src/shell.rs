//! Per-session view state: loading, error or ready.
//!
//! Local state only changes after the store has confirmed a write.

use crate::errors::{ActionError, SessionError};
use crate::goal::{self, progress_percentage};
use crate::identity::{LaunchContext, resolve_identity};
use crate::ledger::{self, DayLog};
use crate::models::{Dashboard, ErrorView, IntakeEvent, Profile};
use crate::profile;
use crate::store::Store;
use chrono::NaiveDate;
use std::collections::VecDeque;
use tracing::{debug, error, info};

const REQUEST_WINDOW: usize = 32;

#[derive(Debug, Clone)]
pub enum ViewState {
    Loading,
    Error(ErrorView),
    Ready,
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Loading => "loading",
            ViewState::Error(_) => "error",
            ViewState::Ready => "ready",
        }
    }
}

#[derive(Debug)]
pub struct Shell {
    context: LaunchContext,
    view: ViewState,
    date: NaiveDate,
    profile: Option<Profile>,
    log: DayLog,
    recent_requests: VecDeque<(String, IntakeEvent)>,
}

impl Shell {
    pub fn new(context: LaunchContext, date: NaiveDate) -> Self {
        Self {
            context,
            view: ViewState::Loading,
            date,
            profile: None,
            log: DayLog::default(),
            recent_requests: VecDeque::new(),
        }
    }

    pub fn context(&self) -> &LaunchContext {
        &self.context
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn user_id(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.user_id.as_str())
    }

    pub fn dashboard(&self) -> Option<Dashboard> {
        if !matches!(self.view, ViewState::Ready) {
            return None;
        }
        let profile = self.profile.clone()?;
        let total = self.log.total();
        Some(Dashboard {
            date: self.date,
            entries: self.log.entries(),
            total,
            goal: profile.daily_goal,
            percentage: progress_percentage(total, profile.daily_goal),
            profile,
        })
    }

    /// Identity, then profile, then today's events. Any failure lands in
    /// the error state.
    pub async fn bootstrap(&mut self, store: &dyn Store) -> &ViewState {
        self.view = ViewState::Loading;
        if self.context.debug_requested() {
            debug!(context = ?self.context, "bootstrapping with launch context");
        }

        match self.load(store).await {
            Ok((profile, events)) => {
                info!(user_id = %profile.user_id, events = events.len(), date = %self.date, "session ready");
                self.log.replace(events);
                self.profile = Some(profile);
                self.view = ViewState::Ready;
            }
            Err(err) => {
                error!(kind = err.kind(), "bootstrap failed: {err}");
                self.view = ViewState::Error(ErrorView {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                    retriable: err.retriable(),
                });
            }
        }
        &self.view
    }

    async fn load(&self, store: &dyn Store) -> Result<(Profile, Vec<IntakeEvent>), SessionError> {
        let identity = resolve_identity(&self.context).ok_or(SessionError::NoIdentity)?;
        let profile = profile::reconcile(store, &identity).await?;
        let events = ledger::list_today(store, &profile.user_id, self.date)
            .await
            .map_err(SessionError::from_lookup)?;
        Ok((profile, events))
    }

    /// Restart from identity resolution. Only valid from the error state.
    pub async fn retry(&mut self, store: &dyn Store, date: NaiveDate) -> Result<&ViewState, ActionError> {
        if !matches!(self.view, ViewState::Error(_)) {
            return Err(ActionError::NotReady);
        }
        self.date = date;
        Ok(self.bootstrap(store).await)
    }

    /// Log one drink. A repeated `request_id` returns the confirmed event
    /// from the first call without writing again.
    pub async fn add_water(
        &mut self,
        store: &dyn Store,
        amount: &serde_json::Value,
        request_id: Option<&str>,
        date: NaiveDate,
    ) -> Result<IntakeEvent, ActionError> {
        let user_id = self.user_id().ok_or(ActionError::NotReady)?.to_string();
        if !matches!(self.view, ViewState::Ready) {
            return Err(ActionError::NotReady);
        }

        if let Some(id) = request_id {
            if let Some((_, event)) = self.recent_requests.iter().find(|(seen, _)| seen == id) {
                debug!(request_id = id, "duplicate add ignored");
                return Ok(event.clone());
            }
        }

        let amount = ledger::parse_amount(amount)?;
        if date != self.date {
            let events = ledger::list_today(store, &user_id, date).await?;
            self.date = date;
            self.log.replace(events);
        }

        let event = ledger::append(store, &user_id, amount, self.date).await?;
        self.log.record(event.clone());

        if let Some(id) = request_id {
            if self.recent_requests.len() == REQUEST_WINDOW {
                self.recent_requests.pop_front();
            }
            self.recent_requests.push_back((id.to_string(), event.clone()));
        }
        Ok(event)
    }

    /// Invalid goals are ignored: the profile is returned unchanged.
    pub async fn set_goal(
        &mut self,
        store: &dyn Store,
        raw: &serde_json::Value,
    ) -> Result<Profile, ActionError> {
        let profile = match (&self.view, &self.profile) {
            (ViewState::Ready, Some(profile)) => profile.clone(),
            _ => return Err(ActionError::NotReady),
        };

        let Some(goal) = goal::parse_goal_value(raw) else {
            debug!(user_id = %profile.user_id, "ignoring invalid goal input");
            return Ok(profile);
        };

        let updated = goal::update_goal(store, &profile.user_id, goal).await?;
        self.profile = Some(updated.clone());
        Ok(updated)
    }
}
