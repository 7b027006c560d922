use rocket::{
    async_trait,
    outcome::Outcome::Success,
    request::{FlashMessage, FromRequest, Outcome, Request},
};
use rocket_dyn_templates::Template;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{bootstrap::AppConfig, quill_log, structs::*};

/// Per-request rendering context: the flash message, who is logged in and
/// where the request went. Pages add their own data on top.
pub struct AppContext<'r> {
    flash: Option<FlashMessage<'r>>,
    current_user: Option<CurrentUser>,
    environment: String,
    request_uri: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FlashView {
    pub kind: String,
    pub message: String,
}

#[derive(Serialize, Debug, Default)]
pub struct BaseContext {
    pub flash: Option<FlashView>,
    pub current_user: Option<CurrentUser>,
    pub environment: String,
    pub request_uri: String,
}

#[async_trait]
impl<'r> FromRequest<'r> for AppContext<'r> {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let flash = match req.guard::<FlashMessage<'_>>().await {
            Success(flash) => Some(flash),
            _ => None,
        };

        let current_user = req.guard::<Option<CurrentUser>>().await.succeeded().flatten();

        let environment = req.rocket().state::<AppConfig>().map(|config| config.settings.environment.clone()).unwrap_or_default();

        Success(AppContext {
            flash,
            current_user,
            environment,
            request_uri: req.uri().path().to_string(),
        })
    }
}

impl<'r> AppContext<'r> {
    pub fn build_context(&self) -> BaseContext {
        BaseContext {
            flash: self.flash.as_ref().map(|f| FlashView {
                kind: f.kind().to_string(),
                message: f.message().to_string(),
            }),
            current_user: self.current_user.clone(),
            environment: self.environment.clone(),
            request_uri: self.request_uri.clone(),
        }
    }

    pub fn render(&self, page_key: &str) -> Template {
        self.render_with(page_key, ())
    }

    pub fn render_with<T: Serialize>(&self, page_key: &str, extra: T) -> Template {
        Template::render(page_key.to_string(), merge_context(self.build_context(), extra))
    }

    /// Re-renders a form page with an inline error in place of the flash.
    pub fn render_with_error<T: Serialize>(&self, page_key: &str, extra: T, message: impl Into<String>) -> Template {
        let mut base = self.build_context();
        base.flash = Some(FlashView {
            kind: "error".to_string(),
            message: message.into(),
        });
        Template::render(page_key.to_string(), merge_context(base, extra))
    }
}

fn merge_context<T: Serialize>(base: BaseContext, extra: T) -> Value {
    let mut context = Map::new();

    for value in [serde_json::to_value(&base), serde_json::to_value(&extra)] {
        match value {
            Ok(Value::Object(obj)) => context.extend(obj),
            Ok(Value::Null) => {}
            Ok(other) => quill_log!(Warning, format!("Ignoring non-object template data: {}", other)),
            Err(e) => quill_log!(Error, format!("Failed to serialize template data: {}", e)),
        }
    }

    Value::Object(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_data_is_merged_over_the_base() {
        let base = BaseContext {
            environment: "test".to_string(),
            request_uri: "/".to_string(),
            ..BaseContext::default()
        };

        let merged = merge_context(base, json!({"posts": [1, 2], "request_uri": "/override"}));

        assert_eq!(merged["environment"], "test");
        assert_eq!(merged["posts"], json!([1, 2]));
        assert_eq!(merged["request_uri"], "/override");
        assert_eq!(merged["current_user"], Value::Null);
    }

    #[test]
    fn unit_extra_adds_nothing() {
        let merged = merge_context(BaseContext::default(), ());
        assert_eq!(merged.as_object().map(|o| o.len()), Some(4));
    }
}
