use serde_json::Value;

use crate::client::settings::{KeyValueStore, Settings, StoreError};
use crate::client::transport::{
    GenerationForm, GenerationTransport, ImageFile, TransportError, TransportResponse,
};
use crate::consts::GENERIC_CLIENT_FAILURE;
use crate::videogen::types::{GenerateTrailerResponse, GenerationResult};

#[derive(Debug, Clone, PartialEq)]
pub enum FormStatus {
    Idle,
    Loading,
    Error(String),
}

/// What the form shows. Exactly one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum View<'a> {
    Idle,
    Loading,
    Error(&'a str),
    Result {
        script: &'a str,
        video_url: &'a str,
    },
}

/// Puts the status back to an error if a submission never reaches `finish`,
/// e.g. when its future is dropped mid-flight.
struct LoadingGuard<'a> {
    status: &'a mut FormStatus,
    finished: bool,
}

impl<'a> LoadingGuard<'a> {
    fn arm(status: &'a mut FormStatus) -> Self {
        *status = FormStatus::Loading;
        Self {
            status,
            finished: false,
        }
    }

    fn finish(mut self, status: FormStatus) {
        *self.status = status;
        self.finished = true;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            *self.status = FormStatus::Error(GENERIC_CLIENT_FAILURE.to_string());
        }
    }
}

pub struct FormController<S, T> {
    settings: Settings<S>,
    transport: T,
    require_image: bool,
    image: Option<ImageFile>,
    prompt: String,
    status: FormStatus,
    result: Option<GenerationResult>,
}

impl<S: KeyValueStore, T: GenerationTransport> FormController<S, T> {
    /// Seeds the credential from `store`
    pub fn new(store: S, transport: T, require_image: bool) -> Self {
        Self {
            settings: Settings::load(store),
            transport,
            require_image,
            image: None,
            prompt: String::new(),
            status: FormStatus::Idle,
            result: None,
        }
    }

    pub fn set_image(&mut self, image: Option<ImageFile>) {
        self.image = image;
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_credential(&mut self, credential: impl Into<String>) -> Result<(), StoreError> {
        self.settings.set_credential(credential)
    }

    pub fn credential(&self) -> &str {
        self.settings.credential()
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == FormStatus::Loading
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        self.result.as_ref()
    }

    pub fn can_submit(&self) -> bool {
        !self.is_loading()
            && !self.settings.credential().trim().is_empty()
            && !self.prompt.trim().is_empty()
            && (!self.require_image || self.image.is_some())
    }

    pub fn view(&self) -> View<'_> {
        match (&self.status, &self.result) {
            (FormStatus::Loading, _) => View::Loading,
            (FormStatus::Error(message), _) => View::Error(message),
            (FormStatus::Idle, Some(result)) => View::Result {
                script: &result.script,
                video_url: &result.video_url,
            },
            (FormStatus::Idle, None) => View::Idle,
        }
    }

    /// Sends the form once. Does nothing while a submission is in flight or when a
    /// required field is empty.
    pub async fn submit(&mut self) {
        if !self.can_submit() {
            return;
        }

        let form = GenerationForm {
            image: self.image.clone(),
            prompt: self.prompt.clone(),
            api_token: self.settings.credential().to_string(),
        };

        self.result = None;
        let guard = LoadingGuard::arm(&mut self.status);
        let outcome = self.transport.submit(form).await;

        match interpret_response(outcome) {
            Ok(result) => {
                self.result = Some(result);
                guard.finish(FormStatus::Idle);
            }
            Err(message) => guard.finish(FormStatus::Error(message)),
        }
    }
}

fn interpret_response(
    outcome: Result<TransportResponse, TransportError>,
) -> Result<GenerationResult, String> {
    let response = outcome.map_err(|e| {
        log::error!("Error generating trailer: {e}");
        GENERIC_CLIENT_FAILURE.to_string()
    })?;

    match response.body.get("error") {
        None | Some(Value::Null) => {}
        Some(Value::String(message)) if !message.is_empty() => return Err(message.clone()),
        Some(_) => return Err(GENERIC_CLIENT_FAILURE.to_string()),
    }

    if !(200..300).contains(&response.status) {
        return Err(GENERIC_CLIENT_FAILURE.to_string());
    }

    serde_json::from_value::<GenerateTrailerResponse>(response.body)
        .map(|body| body.present)
        .map_err(|e| {
            log::error!("Unexpected generation response: {e}");
            GENERIC_CLIENT_FAILURE.to_string()
        })
}
