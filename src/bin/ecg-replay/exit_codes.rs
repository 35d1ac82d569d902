use ecg_replay::ReplayError;

pub const SUCCESS: i32 = 0;
pub const RUNTIME_ERROR: i32 = 1;
pub const CONFIG_ERROR: i32 = 2;
pub const NO_DATA: i32 = 3;

pub fn for_error(error: &ReplayError) -> i32 {
    match error {
        ReplayError::Configuration { .. } => CONFIG_ERROR,
        e if e.is_no_data() => NO_DATA,
        _ => RUNTIME_ERROR,
    }
}
