rust_i18n::i18n!("locales", fallback = "pt");

pub mod config;
pub mod error;
pub mod features;
pub mod i18n;
pub mod logging;
pub mod router;
pub mod state;
pub mod ui;


pub use router::{dispatch, Command, Core};

use features::misc_screens::error_ui;
use jni::objects::{JClass, JString};
use jni::sys::jstring;
use jni::JNIEnv;
use std::ptr;

#[no_mangle]
pub extern "system" fn Java_com_antoniositoe533_safezone_MainActivity_dispatch(
    mut env: JNIEnv,
    _class: JClass,
    input: JString,
) -> jstring {
    let response = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let input_str: String = env
            .get_string(&input)
            .map(|s| s.into())
            .unwrap_or_else(|_| "{}".to_string());
        router::dispatch(&input_str)
    }));

    let output_string = match response {
        Ok(output) => output,
        Err(_) => {
            tracing::error!("dispatch panicked");
            error_ui("panic").to_string()
        }
    };

    match env.new_string(output_string) {
        Ok(java_str) => java_str.into_raw(),
        Err(_) => {
            let fallback = error_ui("jni_new_string_failed").to_string();
            env.new_string(fallback)
                .map(|s| s.into_raw())
                .unwrap_or(ptr::null_mut())
        }
    }
}
