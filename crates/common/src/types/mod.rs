use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

/// Generic `{"message": ...}` acknowledgement body.
#[derive(Serialize, Debug)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { message: msg.into() }
    }
}
