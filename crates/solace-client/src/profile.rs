//! Profile edit form.
//!
//! The form mirrors the profile document field for field. Loading replaces
//! every field; saving sends every field, never a diff. Email is shown but
//! can't be edited here.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::{info, warn};

use solace_gateway::{Backend, Subscription};
use solace_types::api::Navigation;
use solace_types::models::{UserProfile, collections};
use solace_types::{Filter, Query};

use crate::error::{ClientError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    user_id: String,
    email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    /// `YYYY-MM-DD`, or empty.
    pub date_of_birth: String,
    pub is_athlete: bool,
    pub sport: String,
}

impl ProfileForm {
    pub fn from_profile(profile: &UserProfile) -> Self {
        let mut form = Self::default();
        form.load(profile);
        form
    }

    /// Replace every field with the profile's values.
    pub fn load(&mut self, profile: &UserProfile) {
        *self = Self {
            user_id: profile.id.clone(),
            email: profile.email.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            phone: profile.phone.clone(),
            date_of_birth: profile
                .date_of_birth
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            is_athlete: profile.is_athlete,
            sport: profile.sport.clone(),
        };
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Read-only.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// The full field set written on save.
    pub fn to_fields(&self) -> Result<Map<String, Value>> {
        let date_of_birth = match self.date_of_birth.trim() {
            "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, DATE_FORMAT)
                    .map_err(|_| ClientError::Validation("Date of birth must be YYYY-MM-DD".into()))?,
            ),
        };

        // Sport only applies to athletes.
        let sport = if self.is_athlete { self.sport.trim() } else { "" };

        let mut fields = Map::new();
        fields.insert("firstName".into(), self.first_name.trim().into());
        fields.insert("lastName".into(), self.last_name.trim().into());
        fields.insert("email".into(), self.email.as_str().into());
        fields.insert("phone".into(), self.phone.trim().into());
        fields.insert(
            "dateOfBirth".into(),
            date_of_birth.map(|d| d.format(DATE_FORMAT).to_string()).into(),
        );
        fields.insert("isAthlete".into(), self.is_athlete.into());
        fields.insert("sport".into(), sport.into());
        Ok(fields)
    }

    /// Write the form. On success the screen goes back; on failure the form
    /// keeps its values so the user can retry.
    pub async fn save<B: Backend>(&self, backend: &B) -> Result<Navigation> {
        if self.user_id.is_empty() {
            return Err(ClientError::NotSignedIn);
        }

        let fields = self.to_fields()?;
        match backend.update(collections::PROFILES, &self.user_id, fields).await {
            Ok(()) => {
                info!(user = %self.user_id, "profile saved");
                Ok(Navigation::Back)
            }
            Err(e) => {
                warn!(user = %self.user_id, error = %e, "profile save failed");
                Err(e.into())
            }
        }
    }
}

/// Keep `form` in step with the stored profile: every change to the
/// profile document reloads the whole form.
pub fn watch_profile<B: Backend>(backend: &B, user_id: &str, form: Arc<Mutex<ProfileForm>>) -> Subscription {
    let query = Query::collection(collections::PROFILES).filter(Filter::document_id(user_id));
    let user = user_id.to_string();

    backend.watch(
        query,
        Box::new(move |docs| {
            let Some(doc) = docs.first() else {
                return;
            };
            match doc.decode::<UserProfile>() {
                Ok(profile) => form.lock().unwrap_or_else(PoisonError::into_inner).load(&profile),
                Err(e) => warn!(user = %user, error = %e, "unreadable profile"),
            }
        }),
        Box::new(|e| warn!(error = %e, "profile watch stopped")),
    )
}
