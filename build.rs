fn main() {
    // N-API link flags are only needed when the bridge is compiled in.
    if std::env::var_os("CARGO_FEATURE_NAPI").is_some() {
        napi_build::setup();
    }
}
