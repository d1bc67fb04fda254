use thiserror::Error;
use url::Url;

/// Learner-facing settings plus the remote generator credentials.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TutorSettings {
    eli5_mode: bool,
    api_key: Option<String>,
    api_model: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct TutorSettingsDraft {
    pub eli5_mode: bool,
    pub api_key: Option<String>,
    pub api_model: Option<String>,
    pub api_base_url: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("invalid base URL")]
    InvalidBaseUrl,
}

impl TutorSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft into persisted settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the base URL is present but invalid.
    pub fn validate(self) -> Result<TutorSettings, SettingsError> {
        let api_key = normalize_optional(self.api_key);
        let api_model = normalize_optional(self.api_model);
        let api_base_url = normalize_optional(self.api_base_url);

        if let Some(url) = api_base_url.as_ref() {
            if Url::parse(url).is_err() {
                return Err(SettingsError::InvalidBaseUrl);
            }
        }

        Ok(TutorSettings {
            eli5_mode: self.eli5_mode,
            api_key,
            api_model,
            api_base_url,
        })
    }
}

impl TutorSettings {
    /// Rehydrate settings from storage, re-running validation.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the stored base URL is invalid.
    pub fn from_persisted(draft: TutorSettingsDraft) -> Result<Self, SettingsError> {
        draft.validate()
    }

    #[must_use]
    pub fn eli5_mode(&self) -> bool {
        self.eli5_mode
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    #[must_use]
    pub fn api_model(&self) -> Option<&str> {
        self.api_model.as_deref()
    }

    #[must_use]
    pub fn api_base_url(&self) -> Option<&str> {
        self.api_base_url.as_deref()
    }

    /// Editable copy, for settings forms.
    #[must_use]
    pub fn to_draft(&self) -> TutorSettingsDraft {
        TutorSettingsDraft {
            eli5_mode: self.eli5_mode,
            api_key: self.api_key.clone(),
            api_model: self.api_model.clone(),
            api_base_url: self.api_base_url.clone(),
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
