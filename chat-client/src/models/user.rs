use garde::Validate;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{MAX_ID_LENGTH, MAX_NAME_LENGTH};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Validate)]
pub struct User {
    #[garde(length(min = 1, max = MAX_ID_LENGTH))]
    pub id: String,
    #[garde(length(chars, min = 1, max = MAX_NAME_LENGTH))]
    pub name: String,
    #[garde(skip)]
    pub picture: Option<Url>,
}
