pub use actix_web::web::{scope, Data, Json, Path, ServiceConfig};
use crate::store::NotFound;
use actix_web::http::StatusCode;
use buildfarm_common::errors;
use std::fmt;

#[derive(Debug)]
pub struct Error {
    err: buildfarm_common::errors::Error,
    status: StatusCode,
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    /// An administrative command the current state doesn't allow. Unknown ids
    /// are reported as 404, everything else as 400.
    pub fn rejected(err: errors::Error) -> Error {
        if err.downcast_ref::<NotFound>().is_some() {
            errors::debug!("Rejected request: {err:#}");
            Error {
                err,
                status: StatusCode::NOT_FOUND,
            }
        } else {
            errors::warn!("Rejected request: {err:#}");
            Error {
                err,
                status: StatusCode::BAD_REQUEST,
            }
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, w: &mut fmt::Formatter) -> fmt::Result {
        write!(w, "{:#}", self.err)
    }
}

impl actix_web::error::ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        self.status
    }
}

impl From<errors::Error> for Error {
    fn from(err: errors::Error) -> Error {
        if err.downcast_ref::<NotFound>().is_some() {
            return Error {
                err,
                status: StatusCode::NOT_FOUND,
            };
        }
        errors::error!("Error occurred in http handler: {err:#}");
        Error {
            err,
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
