// Live checks against the real app.
//
// Every suite shares one process so `AuthenticatedSession::shared` logs in
// once per run. The authenticated checks need RHOMBUS_EMAIL, RHOMBUS_PASSWORD,
// and a browser. Run with `cargo test -p rhombus-smoke --test live -- --ignored`;
// set RHOMBUS_REUSE_SESSION=1 to load a session saved by `rhombus-smoke setup`.

mod api_contract;
mod ui_flow;
