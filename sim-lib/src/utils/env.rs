pub const fn project_name() -> &'static str {
    "endpoint-sim"
}

/// Value used for the `server` header of all responses.
pub const fn server_identifier() -> &'static str {
    concat!("endpoint-sim/", env!("CARGO_PKG_VERSION"))
}
