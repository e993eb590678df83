use std::convert::Infallible;

use warp::{reject::Rejection, Filter};

use super::jwt::{verify_jwt_session, JwtSessionData};

/// Requires a valid session cookie, discarding the session payload.
pub fn with_auth() -> impl Filter<Extract = ((),), Error = Rejection> + Copy {
    warp::cookie::<String>("session").and_then(|session: String| async move {
        match verify_jwt_session(session) {
            Ok(_) => Ok(()),
            Err(e) => Err(warp::reject::custom(e)),
        }
    })
}

/// Requires a valid session cookie and extracts the session payload.
pub fn with_session() -> impl Filter<Extract = (JwtSessionData,), Error = Rejection> + Copy {
    warp::cookie::<String>("session").and_then(|session: String| async move {
        match verify_jwt_session(session) {
            Ok(data) => Ok(data),
            Err(e) => Err(warp::reject::custom(e)),
        }
    })
}

/// Extracts the session when present and valid; anonymous requests pass
/// through as `None` so viewer-relative filters degrade to no-ops. Never
/// rejects.
pub fn with_possible_session(
) -> impl Filter<Extract = (Option<JwtSessionData>,), Error = Infallible> + Copy {
    warp::cookie::optional::<String>("session").map(move |session: Option<String>| {
        session.and_then(|session| verify_jwt_session(session).ok())
    })
}
