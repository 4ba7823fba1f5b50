use anyhow::Context;
use utoipa::OpenApi;
use wordle_golf_back::services::documentation::ApiDoc;

fn main() -> anyhow::Result<()> {
    let doc = ApiDoc::openapi();
    println!("{}", doc.to_pretty_json().context("serializing OpenAPI document")?);
    Ok(())
}
