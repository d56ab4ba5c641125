/// External collaborator that runs the user consent flow.
///
/// `request_authorization` only starts the flow and returns immediately; the
/// outcome arrives later as a message through
/// `StreamContext::on_authorization_result`.
pub trait AuthorizationRequester: Send + Sync {
    fn request_authorization(&self);
}
