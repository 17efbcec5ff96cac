use secret_probe_core::contract::QueryRows;

/// Connection parameters for one session. Holds the password, so no `Debug`.
#[derive(Clone, Copy)]
pub struct ConnectTarget<'a> {
    pub host: &'a str,
    pub port: u16,
    pub user: Option<&'a str>,
    pub password: Option<&'a str>,
}

pub trait DatabaseConnector {
    fn connect(&self, target: &ConnectTarget<'_>) -> Result<Box<dyn DatabaseSession>, String>;
}

pub trait DatabaseSession {
    fn fetch_all(&mut self, sql: &str) -> Result<QueryRows, String>;

    /// Ends the session. Failures are logged by the implementation.
    fn close(self: Box<Self>);
}
