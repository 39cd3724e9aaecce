//! Session Addressing and the Front Door
//!
//! Every inbound request goes through [`FrontDoor`], which turns the fixed
//! session name into an id, asks a [`SessionNamespace`] for the live instance
//! behind that id and forwards the raw request to it. The namespace creates an
//! instance lazily the first time an id is requested and hands back the same
//! instance afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::error::{DispatchError, ToolError};
use crate::core::protocol::MCPResponse;
use crate::core::session::McpSession;

/// Logical name every request is routed to.
pub const SESSION_NAME: &str = "mcp-agent";

/// Stable address of a session, derived from its logical name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn from_name(name: &str) -> Self {
        Self(blake3::hash(name.as_bytes()).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to a live session.
///
/// Requests are run one at a time per session; the registry inside the
/// session relies on this and has no locking of its own.
pub struct SessionStub {
    /// Address this stub was created for
    id: SessionId,
    /// The session; the lock admits one request at a time
    session: Mutex<McpSession>,
}

impl SessionStub {
    pub fn new(id: SessionId, session: McpSession) -> Self {
        Self {
            id,
            session: Mutex::new(session),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Forward a raw request to the session and wait for its answer.
    pub async fn fetch(&self, request: &[u8]) -> Option<MCPResponse> {
        let session = self.session.lock().await;
        session.handle_raw(request)
    }

    /// Names of the tools the session currently offers.
    pub async fn tool_names(&self) -> Vec<String> {
        let session = self.session.lock().await;
        session
            .registry()
            .tool_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

/// Maps names to ids and ids to single live session instances.
#[async_trait]
pub trait SessionNamespace: Send + Sync {
    fn id_from_name(&self, name: &str) -> SessionId;

    /// Return the instance for `id`, creating it on first use.
    async fn get(&self, id: &SessionId) -> Result<Arc<SessionStub>, DispatchError>;
}

/// Builds a fresh session for an id the namespace has not seen yet.
pub type SessionFactory = Box<dyn Fn(&SessionId) -> Result<McpSession, ToolError> + Send + Sync>;

/// In-process namespace holding sessions for the lifetime of the server.
pub struct LocalNamespace {
    /// Live sessions, created on first lookup and never evicted
    sessions: Mutex<HashMap<SessionId, Arc<SessionStub>>>,
    /// Builds the session behind an unseen id
    factory: SessionFactory,
}

impl LocalNamespace {
    /// # Arguments
    /// * `factory` - Called once per id, on its first lookup
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            factory,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl SessionNamespace for LocalNamespace {
    fn id_from_name(&self, name: &str) -> SessionId {
        SessionId::from_name(name)
    }

    async fn get(&self, id: &SessionId) -> Result<Arc<SessionStub>, DispatchError> {
        // Held across creation so concurrent first lookups build one instance.
        let mut sessions = self.sessions.lock().await;
        if let Some(stub) = sessions.get(id) {
            return Ok(Arc::clone(stub));
        }

        let session = (self.factory)(id).map_err(|source| DispatchError::Creation {
            id: id.to_string(),
            source,
        })?;
        info!(session = %id, "session created");
        let stub = Arc::new(SessionStub::new(id.clone(), session));
        sessions.insert(id.clone(), Arc::clone(&stub));
        Ok(stub)
    }
}

/// Network-facing entry point that routes everything to one session.
#[derive(Clone)]
pub struct FrontDoor {
    /// Addressing substrate resolving names to live sessions
    namespace: Arc<dyn SessionNamespace>,
    /// Logical name every request is forwarded to
    session_name: String,
}

impl FrontDoor {
    /// Create a front door addressing the fixed `mcp-agent` session.
    ///
    /// # Arguments
    /// * `namespace` - Substrate that owns and creates sessions
    pub fn new(namespace: Arc<dyn SessionNamespace>) -> Self {
        Self {
            namespace,
            session_name: SESSION_NAME.to_string(),
        }
    }

    /// Resolve the fixed session name to its live instance.
    pub async fn resolve(&self) -> Result<Arc<SessionStub>, DispatchError> {
        let id = self.namespace.id_from_name(&self.session_name);
        self.namespace.get(&id).await
    }

    /// Forward `request` unmodified and return the session's answer unmodified.
    ///
    /// # Arguments
    /// * `request` - Raw JSON-RPC message bytes
    ///
    /// # Errors
    ///
    /// Only when the session cannot be addressed or created.
    pub async fn handle(&self, request: &[u8]) -> Result<Option<MCPResponse>, DispatchError> {
        let stub = self.resolve().await?;
        debug!(session = %stub.id(), bytes = request.len(), "forwarding request");
        Ok(stub.fetch(request).await)
    }
}
