use serde::Serialize;
use tera::{Context, Tera};

use crate::{error::AppError, flow::Page, models::Field};

/// Compiles the page templates shipped with the binary.
pub fn load() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../templates/base.html")),
        ("index.html", include_str!("../templates/index.html")),
        ("graph.html", include_str!("../templates/graph.html")),
    ])?;
    Ok(tera)
}

#[derive(Serialize)]
struct Checkbox {
    name: &'static str,
    label: &'static str,
}

pub fn index_page(tera: &Tera, flashes: &[String]) -> Result<String, AppError> {
    let fields: Vec<Checkbox> = Field::ALL
        .iter()
        .map(|field| Checkbox {
            name: field.form_name(),
            label: field.label(),
        })
        .collect();

    let mut context = Context::new();
    context.insert("flashes", flashes);
    context.insert("fields", &fields);
    Ok(tera.render("index.html", &context)?)
}

pub fn graph_page(tera: &Tera, page: &Page) -> Result<String, AppError> {
    let context = Context::from_serialize(page)?;
    Ok(tera.render("graph.html", &context)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_lists_every_checkbox_and_escapes_flashes() {
        let tera = load().unwrap();
        let html = index_page(&tera, &["<b>bad</b> ticker".to_string()]).unwrap();
        for field in Field::ALL {
            assert!(html.contains(&format!("name=\"{}\"", field.form_name())));
        }
        assert!(html.contains("name=\"stock\""));
        assert!(html.contains("&lt;b&gt;bad&lt;&#x2F;b&gt; ticker"));
    }

    #[test]
    fn graph_embeds_fragments_verbatim_and_escapes_the_name() {
        let tera = load().unwrap();
        let page = Page {
            stock_name: "Acme & Sons".to_string(),
            script: "<script>vegaEmbed()</script>".to_string(),
            div: "<div id=\"chart-1\"></div>".to_string(),
        };
        let html = graph_page(&tera, &page).unwrap();
        assert!(html.contains("<title>Acme &amp; Sons</title>"));
        assert!(html.contains("<script>vegaEmbed()</script>"));
        assert!(html.contains("<div id=\"chart-1\"></div>"));
        assert!(html.contains("vega-embed"));
    }
}
