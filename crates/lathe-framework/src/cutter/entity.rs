//! Cutters that resolve users and communities through the API.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use lathe_core::{ApiClientExt, ApiError, BoxedApi};

use super::{CutContext, CutResult, Cutter, Parsed, Value, match_prefix};
use crate::error::BadArgument;

/// `[id1|Name]`, `[club1|Name]` and friends, as inserted by the chat client.
static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(id|club|public|event)([0-9]+)\|([^\]]*)\]").expect("mention pattern is valid")
});

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.|m\.)?vk\.(?:com|ru)/([A-Za-z0-9_]+(?:\.[A-Za-z0-9_]+)*)")
        .expect("link pattern is valid")
});

static RAW_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+").expect("id pattern is valid"));

/// Which kind of entity an [`EntityCutter`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Group,
    /// A user or a community, whichever the input names.
    Any,
}

impl EntityKind {
    fn accepts_user(self) -> bool {
        matches!(self, Self::User | Self::Any)
    }

    fn accepts_group(self) -> bool {
        matches!(self, Self::Group | Self::Any)
    }
}

/// What the syntactic part of a cut found, before any API call.
enum Reference<'a> {
    User(String),
    Group(String),
    /// A screen name that may belong to either kind.
    ScreenName(&'a str),
}

/// Parses a reference to a user or a community and resolves it through the
/// API client.
///
/// Accepted forms, tried in order:
///
/// 1. a mention such as `[id1|Pavel]`;
/// 2. a profile link such as `https://vk.com/durov` (enabled by default);
/// 3. a bare numeric id (disabled by default);
/// 4. the sender of the replied-to or first forwarded message, consuming
///    nothing (enabled by default).
///
/// Once the text matches one of the forms the cut is committed to it: a
/// failed lookup fails the cut without trying later forms.
#[derive(Debug, Clone)]
pub struct EntityCutter {
    kind: EntityKind,
    accept_link: bool,
    accept_raw_id: bool,
    accept_attached: bool,
}

impl EntityCutter {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            accept_link: true,
            accept_raw_id: false,
            accept_attached: true,
        }
    }

    pub fn user() -> Self {
        Self::new(EntityKind::User)
    }

    pub fn group() -> Self {
        Self::new(EntityKind::Group)
    }

    pub fn any() -> Self {
        Self::new(EntityKind::Any)
    }

    pub fn accept_link(mut self, accept: bool) -> Self {
        self.accept_link = accept;
        self
    }

    pub fn accept_raw_id(mut self, accept: bool) -> Self {
        self.accept_raw_id = accept;
        self
    }

    pub fn accept_attached(mut self, accept: bool) -> Self {
        self.accept_attached = accept;
        self
    }

    fn noun(&self) -> &'static str {
        match self.kind {
            EntityKind::User => "a user",
            EntityKind::Group => "a community",
            EntityKind::Any => "a user or a community",
        }
    }

    /// Finds a reference at the start of `text`.
    fn reference<'a>(&self, text: &'a str) -> Result<Option<(Reference<'a>, &'a str)>, BadArgument> {
        if let Some(caps) = MENTION.captures(text) {
            let end = caps.get(0).map_or(0, |m| m.end());
            let id = caps[2].to_string();
            let reference = if &caps[1] == "id" {
                if !self.kind.accepts_user() {
                    return Err(BadArgument::new("mentioned a user, expected a community"));
                }
                Reference::User(id)
            } else {
                if !self.kind.accepts_group() {
                    return Err(BadArgument::new("mentioned a community, expected a user"));
                }
                Reference::Group(id)
            };
            return Ok(Some((reference, &text[end..])));
        }

        if self.accept_link
            && let Some(caps) = LINK.captures(text)
        {
            let end = caps.get(0).map_or(0, |m| m.end());
            let screen_name = caps.get(1).map_or("", |m| m.as_str());
            return Ok(Some((Reference::ScreenName(screen_name), &text[end..])));
        }

        if self.accept_raw_id
            && let Some((id, rest)) = match_prefix(&RAW_ID, text)
        {
            let reference = match self.kind {
                EntityKind::Group => Reference::Group(id.to_string()),
                EntityKind::User | EntityKind::Any => Reference::User(id.to_string()),
            };
            return Ok(Some((reference, rest)));
        }

        Ok(None)
    }

    /// Finds the sender of an attached message, if any.
    fn attached(&self, ctx: &CutContext) -> Option<Reference<'static>> {
        let from_id = ctx.event()?.attached_sender()?;
        if from_id > 0 && self.kind.accepts_user() {
            Some(Reference::User(from_id.to_string()))
        } else if from_id < 0 && self.kind.accepts_group() {
            Some(Reference::Group((-from_id).to_string()))
        } else {
            None
        }
    }

    async fn resolve(&self, api: &BoxedApi, reference: &Reference<'_>) -> Result<Value, BadArgument> {
        match reference {
            Reference::User(id) => lookup_user(api, id).await,
            Reference::Group(id) => lookup_group(api, id).await,
            Reference::ScreenName(name) => match self.kind {
                EntityKind::User => lookup_user(api, name).await,
                EntityKind::Group => lookup_group(api, name).await,
                EntityKind::Any => match lookup_user(api, name).await {
                    Ok(value) => Ok(value),
                    Err(_) => lookup_group(api, name).await,
                },
            },
        }
    }
}

fn lookup_failed(what: &str, err: ApiError) -> BadArgument {
    debug!(error = %err, what, "entity lookup failed");
    BadArgument::new(format!("could not look up {what}: {err}"))
}

async fn lookup_user(api: &BoxedApi, id: &str) -> Result<Value, BadArgument> {
    match api.fetch_user(id).await {
        Ok(Some(user)) => Ok(Value::User(user)),
        Ok(None) => Err(BadArgument::new(format!("no user {id}"))),
        Err(err) => Err(lookup_failed(id, err)),
    }
}

async fn lookup_group(api: &BoxedApi, id: &str) -> Result<Value, BadArgument> {
    match api.fetch_group(id).await {
        Ok(Some(group)) => Ok(Value::Group(group)),
        Ok(None) => Err(BadArgument::new(format!("no community {id}"))),
        Err(err) => Err(lookup_failed(id, err)),
    }
}

#[async_trait]
impl Cutter for EntityCutter {
    async fn cut<'a>(&self, ctx: &CutContext, text: &'a str) -> CutResult<'a> {
        let (reference, rest) = match self.reference(text)? {
            Some(found) => found,
            None => match self.accept_attached.then(|| self.attached(ctx)).flatten() {
                Some(reference) => (reference, text),
                None => return Err(BadArgument::new(format!("expected {}", self.noun()))),
            },
        };

        let api = ctx
            .api()
            .ok_or_else(|| BadArgument::new("no API client to look up entities"))?;
        let value = self.resolve(api, &reference).await?;
        Ok(Parsed::new(value, rest))
    }

    fn describe(&self) -> String {
        let mut forms = vec!["a mention"];
        if self.accept_link {
            forms.push("a profile link");
        }
        if self.accept_raw_id {
            forms.push("a numeric id");
        }
        let mut description = format!("{} ({})", self.noun(), forms.join(" or "));
        if self.accept_attached {
            description.push_str(", or a reply to their message");
        }
        description
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockApi;
    use lathe_core::{ForeignMessage, MessageEvent};
    use serde_json::json;
    use std::sync::Arc;

    fn durov() -> serde_json::Value {
        json!([{"id": 1, "first_name": "Pavel", "last_name": "Durov", "screen_name": "durov"}])
    }

    fn ctx(api: &Arc<MockApi>, event: MessageEvent) -> CutContext {
        CutContext::new(api.boxed(), Arc::new(event))
    }

    #[tokio::test]
    async fn test_mention_resolves_user() {
        let api = MockApi::new().respond("users.get", durov());
        let ctx = ctx(&api, MessageEvent::new(1, 1, ""));

        let parsed = EntityCutter::user().cut(&ctx, "[id1|Pavel] hi").await.unwrap();
        let Value::User(user) = parsed.value else {
            panic!("expected a user");
        };
        assert_eq!(user.id, 1);
        assert_eq!(parsed.remainder, " hi");
        assert_eq!(api.calls()[0].1["user_ids"], json!("1"));
    }

    #[tokio::test]
    async fn test_group_mention_rejected_for_user() {
        let api = MockApi::new();
        let ctx = ctx(&api, MessageEvent::new(1, 1, ""));
        assert!(EntityCutter::user().cut(&ctx, "[club1|VK]").await.is_err());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_link_resolves_group() {
        let api = MockApi::new().respond("groups.getById", json!({"groups": [{"id": 1, "name": "VK"}]}));
        let ctx = ctx(&api, MessageEvent::new(1, 1, ""));

        let parsed = EntityCutter::group().cut(&ctx, "https://vk.com/team").await.unwrap();
        assert!(matches!(parsed.value, Value::Group(ref g) if g.name == "VK"));
        assert_eq!(api.calls()[0].1["group_id"], json!("team"));
    }

    #[tokio::test]
    async fn test_link_leaves_sentence_period() {
        let api = MockApi::new().respond("users.get", durov());
        let ctx = ctx(&api, MessageEvent::new(1, 1, ""));

        let parsed = EntityCutter::user().cut(&ctx, "vk.com/durov. Thanks").await.unwrap();
        assert_eq!(parsed.remainder, ". Thanks");
        assert_eq!(api.calls()[0].1["user_ids"], json!("durov"));

        let dotted = EntityCutter::user().cut(&ctx, "vk.com/pavel.durov").await.unwrap();
        assert_eq!(dotted.remainder, "");
        assert_eq!(api.calls()[1].1["user_ids"], json!("pavel.durov"));
    }

    #[tokio::test]
    async fn test_any_link_falls_back_to_group() {
        let api = MockApi::new()
            .respond("users.get", json!([]))
            .respond("groups.getById", json!([{"id": 5, "name": "Club"}]));
        let ctx = ctx(&api, MessageEvent::new(1, 1, ""));

        let parsed = EntityCutter::any().cut(&ctx, "vk.com/club5").await.unwrap();
        assert!(matches!(parsed.value, Value::Group(ref g) if g.id == 5));
    }

    #[tokio::test]
    async fn test_raw_id_is_opt_in() {
        let api = MockApi::new().respond("users.get", durov());
        let ctx = ctx(&api, MessageEvent::new(1, 1, ""));

        assert!(EntityCutter::user().accept_attached(false).cut(&ctx, "1").await.is_err());
        let parsed = EntityCutter::user().accept_raw_id(true).cut(&ctx, "1").await.unwrap();
        assert!(matches!(parsed.value, Value::User(_)));
    }

    #[tokio::test]
    async fn test_attached_reply_consumes_nothing() {
        let api = MockApi::new().respond("users.get", durov());
        let event = MessageEvent::new(1, 2, "/ban").with_reply(ForeignMessage {
            from_id: 1,
            text: "hello".into(),
            date: 0,
            conversation_message_id: None,
        });
        let ctx = ctx(&api, event);

        let parsed = EntityCutter::user().cut(&ctx, "rest").await.unwrap();
        assert!(matches!(parsed.value, Value::User(_)));
        assert_eq!(parsed.remainder, "rest");
    }

    #[tokio::test]
    async fn test_unknown_user_is_unmatched() {
        let api = MockApi::new().respond("users.get", json!([]));
        let ctx = ctx(&api, MessageEvent::new(1, 1, ""));
        assert!(EntityCutter::user().cut(&ctx, "[id404|Ghost]").await.is_err());
    }

    #[tokio::test]
    async fn test_api_error_is_unmatched() {
        let api = MockApi::new();
        let ctx = ctx(&api, MessageEvent::new(1, 1, ""));
        let err = EntityCutter::user().cut(&ctx, "[id1|x]").await.unwrap_err();
        assert!(err.reason.contains("could not look up"));
    }

    #[tokio::test]
    async fn test_detached_context_fails() {
        let ctx = CutContext::detached();
        assert!(EntityCutter::user().cut(&ctx, "[id1|x]").await.is_err());
        assert!(EntityCutter::user().cut(&ctx, "nobody").await.is_err());
    }
}
