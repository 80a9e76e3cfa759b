/// Persists the single opaque session token across application restarts.
///
/// This is the only durable local state the client keeps.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<String>;
    fn store(&self, token: &str);
    fn clear(&self);
}
