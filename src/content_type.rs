#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum ContentType {
    Plain,
    JSON,
    JSONP,
}

impl ContentType {
    pub const fn as_str(&self) -> &str {
        match self {
            Self::Plain => "text/plain; charset=utf-8",
            Self::JSON => "application/json; charset=utf-8",
            Self::JSONP => "text/javascript; charset=utf-8",
        }
    }
}
