use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	User,
	Assistant,
}
impl Role {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::User => "user",
			Self::Assistant => "assistant",
		}
	}
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Message {
	pub role: Role,
	pub content: String,
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
}

/// Preference snapshot carried by a session and merged from request context.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct UserContext {
	pub location: Option<String>,
	pub language_preference: Option<String>,
	#[serde(default)]
	pub interests: Vec<String>,
	pub budget_range: Option<String>,
}
impl UserContext {
	fn merge_from(&mut self, other: &UserContext) {
		if other.location.is_some() {
			self.location = other.location.clone();
		}
		if other.language_preference.is_some() {
			self.language_preference = other.language_preference.clone();
		}
		if !other.interests.is_empty() {
			self.interests = other.interests.clone();
		}
		if other.budget_range.is_some() {
			self.budget_range = other.budget_range.clone();
		}
	}

	fn is_empty(&self) -> bool {
		self.location.is_none()
			&& self.language_preference.is_none()
			&& self.interests.is_empty()
			&& self.budget_range.is_none()
	}
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct SessionStats {
	pub session_id: Uuid,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub last_activity: OffsetDateTime,
	pub interaction_count: u64,
	pub conversation_messages: usize,
	pub has_preferences: bool,
}

struct SessionState {
	created_at: OffsetDateTime,
	last_activity: OffsetDateTime,
	interaction_count: u64,
	user_context: UserContext,
	messages: Vec<Message>,
}

/// Per-conversation message history with a hard cap and TTL-based removal.
/// Sessions come to exist on first contact; absence past the TTL is the only
/// way they go away.
#[derive(Clone)]
pub struct SessionStore {
	inner: Arc<Mutex<HashMap<Uuid, SessionState>>>,
	ttl: Duration,
	max_messages: usize,
	keep_last: usize,
	budget_chars: usize,
}
impl SessionStore {
	pub fn new(cfg: &sampan_config::Context) -> Self {
		Self {
			inner: Arc::new(Mutex::new(HashMap::new())),
			ttl: Duration::hours(cfg.session_ttl_hours),
			max_messages: cfg.max_messages,
			keep_last: cfg.keep_last_messages,
			budget_chars: cfg.prompt_budget_chars,
		}
	}

	pub fn create(&self, user_context: Option<&UserContext>) -> (Uuid, OffsetDateTime) {
		let id = Uuid::new_v4();
		let now = OffsetDateTime::now_utc();
		let mut sessions = self.lock();

		sessions.insert(id, SessionState {
			created_at: now,
			last_activity: now,
			interaction_count: 0,
			user_context: user_context.cloned().unwrap_or_default(),
			messages: Vec::new(),
		});

		(id, now)
	}

	/// Resolves the caller's session: a known, unexpired id is refreshed;
	/// anything else gets a new session.
	pub fn ensure(&self, id: Option<Uuid>, user_context: Option<&UserContext>) -> Uuid {
		let now = OffsetDateTime::now_utc();

		if let Some(id) = id {
			let mut sessions = self.lock();

			match sessions.get_mut(&id) {
				Some(session) if now - session.last_activity < self.ttl => {
					session.last_activity = now;
					session.interaction_count += 1;

					if let Some(user_context) = user_context {
						session.user_context.merge_from(user_context);
					}

					return id;
				},
				Some(_) => {
					sessions.remove(&id);
				},
				None => {},
			}
		}

		self.create(user_context).0
	}

	pub fn record_turn(&self, id: Uuid, role: Role, content: &str) {
		let now = OffsetDateTime::now_utc();
		let mut sessions = self.lock();
		let Some(session) = sessions.get_mut(&id) else {
			return;
		};

		session.messages.push(Message { role, content: content.to_string(), timestamp: now });
		session.last_activity = now;

		if session.messages.len() > self.max_messages {
			let excess = session.messages.len() - self.max_messages;

			session.messages.drain(..excess);
		}
	}

	pub fn history(&self, id: Uuid) -> Vec<Message> {
		self.lock().get(&id).map(|session| session.messages.clone()).unwrap_or_default()
	}

	pub fn user_context(&self, id: Uuid) -> Option<UserContext> {
		self.lock()
			.get(&id)
			.map(|session| session.user_context.clone())
			.filter(|context| !context.is_empty())
	}

	/// The prompt slice: the newest `keep_last` messages always survive, and
	/// older ones are kept oldest-dropped-first while the character budget
	/// holds. No summarization, so the slice stays deterministic.
	pub fn bounded_slice(&self, messages: &[Message]) -> Vec<Message> {
		let forced_from = messages.len().saturating_sub(self.keep_last);
		let mut total = 0usize;
		let mut slice = Vec::new();

		for (index, message) in messages.iter().enumerate().rev() {
			let chars = message.content.chars().count();

			if index >= forced_from || total + chars <= self.budget_chars {
				total += chars;
				slice.push(message.clone());
			} else {
				break;
			}
		}

		slice.reverse();

		slice
	}

	pub fn stats(&self, id: Uuid) -> Option<SessionStats> {
		let now = OffsetDateTime::now_utc();
		let sessions = self.lock();
		let session = sessions.get(&id)?;

		if now - session.last_activity >= self.ttl {
			return None;
		}

		Some(SessionStats {
			session_id: id,
			created_at: session.created_at,
			last_activity: session.last_activity,
			interaction_count: session.interaction_count,
			conversation_messages: session.messages.len(),
			has_preferences: !session.user_context.is_empty(),
		})
	}

	pub fn sweep(&self, now: OffsetDateTime) -> usize {
		let mut sessions = self.lock();
		let before = sessions.len();

		sessions.retain(|_, session| now - session.last_activity < self.ttl);

		before - sessions.len()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SessionState>> {
		self.inner.lock().unwrap_or_else(|err| err.into_inner())
	}
}
