use miette::Result;
use pkgbridge_core::version::version_string;

pub fn run(json: bool) -> Result<()> {
    if json {
        let out = serde_json::json!({
            "ok": true,
            "version": pkgbridge_core::VERSION,
        });
        println!("{out}");
    } else {
        println!("{}", version_string());
    }
    Ok(())
}
