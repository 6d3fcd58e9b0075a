#[cfg(feature = "as5216-sdk")]
use std::{env, path::PathBuf};

#[cfg(feature = "as5216-sdk")]
/// Типовые каталоги установки библиотеки
fn find_as5216_lib(name: &str) -> Option<PathBuf> {
    let candidates = [
        "/usr/local/lib",
        "/usr/lib",
        "/usr/lib/x86_64-linux-gnu",
        "C:\\AvaSpec\\lib",
        "C:\\Program Files\\Avantes\\AS5216",
    ];

    let files = [
        format!("lib{name}.so"),
        format!("lib{name}.a"),
        format!("{name}.lib"),
        format!("{name}.dll"),
    ];

    for dir in &candidates {
        let p = PathBuf::from(dir);
        if files.iter().any(|f| p.join(f).exists()) {
            return Some(p);
        }
    }
    None
}

#[cfg(feature = "as5216-sdk")]
fn link_as5216() {
    println!("cargo:rerun-if-env-changed=AVASPEC_LIB_DIR");
    println!("cargo:rerun-if-env-changed=AVASPEC_LIB_NAME");

    let name = env::var("AVASPEC_LIB_NAME").unwrap_or_else(|_| "as5216".to_string());

    match env::var("AVASPEC_LIB_DIR") {
        Ok(dir) => println!("cargo:rustc-link-search=native={dir}"),
        Err(_) => match find_as5216_lib(&name) {
            Some(found) => {
                println!(
                    "cargo:warning=AVASPEC_LIB_DIR not set, auto-detected: {}",
                    found.display()
                );
                println!("cargo:rustc-link-search=native={}", found.display());
            }
            None => println!(
                "cargo:warning=AVASPEC_LIB_DIR not set and {name} not found, relying on the system search path"
            ),
        },
    }

    println!("cargo:rustc-link-lib=dylib={name}");
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Без фичи as5216-sdk объявления extern остаются, но не линкуются
    #[cfg(feature = "as5216-sdk")]
    link_as5216();
}
