//! Alert email templates.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use serde_json::json;
use supplychainx_models::{StockAlert, StockLevel, StockedEntityType};

const SUBJECT: &str = "subject";
const BODY_HTML: &str = "body_html";
const BODY_TEXT: &str = "body_text";

const SUBJECT_TEMPLATE: &str = "[SupplyChainX] {{level_label}}: {{entity_label}} '{{entity_name}}'";

const BODY_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head><style>body{font-family:Arial,sans-serif;line-height:1.6;color:#333;}.header{background:{{color}};color:white;padding:20px;}.content{padding:20px;}.footer{background:#f3f4f6;padding:20px;font-size:12px;}</style></head>
<body>
<div class="header"><h2>{{level_label}}</h2></div>
<div class="content">
<p>{{message}}</p>
<table>
<tr><td>{{entity_label}}</td><td>{{entity_name}} (#{{entity_id}})</td></tr>
<tr><td>Current stock</td><td>{{current_stock}}</td></tr>
<tr><td>Minimum stock</td><td>{{minimum_stock}}</td></tr>
<tr><td>Raised at</td><td>{{raised_at}}</td></tr>
</table>
</div>
<div class="footer">Automated stock alert #{{alert_id}} from SupplyChainX.</div>
</body>
</html>
"#;

const BODY_TEXT_TEMPLATE: &str = r#"{{level_label}}

{{message}}

{{entity_label}}: {{entity_name}} (#{{entity_id}})
Current stock: {{current_stock}}
Minimum stock: {{minimum_stock}}
Raised at: {{raised_at}}

---
Automated stock alert #{{alert_id}} from SupplyChainX.
"#;

/// Template rendering result
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body_html: String,
    pub body_text: String,
}

/// Renders stock alerts into emails. Missing variables are an error rather
/// than an empty string.
pub struct AlertTemplates {
    html: Handlebars<'static>,
    plain: Handlebars<'static>,
}

impl AlertTemplates {
    pub fn new() -> Result<Self> {
        let mut html = Handlebars::new();
        html.set_strict_mode(true);
        html.register_template_string(BODY_HTML, BODY_HTML_TEMPLATE)
            .context("Failed to register HTML alert template")?;

        let mut plain = Handlebars::new();
        plain.set_strict_mode(true);
        plain.register_escape_fn(handlebars::no_escape);
        plain
            .register_template_string(SUBJECT, SUBJECT_TEMPLATE)
            .context("Failed to register alert subject template")?;
        plain
            .register_template_string(BODY_TEXT, BODY_TEXT_TEMPLATE)
            .context("Failed to register text alert template")?;

        Ok(Self { html, plain })
    }

    pub fn render(&self, alert: &StockAlert) -> Result<RenderedEmail> {
        let (level_label, color) = match alert.level {
            StockLevel::OutOfStock => ("Out of stock", "#b91c1c"),
            StockLevel::Critical => ("Critical stock level", "#ea580c"),
            StockLevel::Low => ("Low stock level", "#ca8a04"),
        };
        let entity_label = match alert.entity_type {
            StockedEntityType::RawMaterial => "Raw material",
            StockedEntityType::Product => "Product",
        };

        let data = json!({
            "alert_id": alert.id,
            "level_label": level_label,
            "color": color,
            "entity_label": entity_label,
            "entity_id": alert.entity_id,
            "entity_name": alert.entity_name,
            "message": alert.message,
            "current_stock": alert.current_stock,
            "minimum_stock": alert.minimum_stock,
            "raised_at": alert.created_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        });

        Ok(RenderedEmail {
            subject: self
                .plain
                .render(SUBJECT, &data)
                .context("Failed to render alert subject")?,
            body_html: self
                .html
                .render(BODY_HTML, &data)
                .context("Failed to render HTML alert body")?,
            body_text: self
                .plain
                .render(BODY_TEXT, &data)
                .context("Failed to render text alert body")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supplychainx_models::StockSnapshot;

    fn alert(name: &str, current: i32) -> StockAlert {
        let mut alert = StockAlert::raise(&StockSnapshot {
            entity_type: StockedEntityType::RawMaterial,
            entity_id: 42,
            entity_name: name.to_string(),
            current_stock: current,
            minimum_stock: 20,
        });
        alert.id = 7;
        alert
    }

    #[test]
    fn test_render_critical_alert() {
        let email = AlertTemplates::new().unwrap().render(&alert("Steel sheet", 3)).unwrap();

        assert_eq!(email.subject, "[SupplyChainX] Critical stock level: Raw material 'Steel sheet'");
        assert!(email.body_text.contains("Current stock: 3"));
        assert!(email.body_text.contains("Minimum stock: 20"));
        assert!(email.body_text.contains("alert #7"));
        assert!(email.body_html.contains("Steel sheet (#42)"));
    }

    #[test]
    fn test_html_body_is_escaped_but_text_is_not() {
        let email = AlertTemplates::new().unwrap().render(&alert("Nuts & <bolts>", 0)).unwrap();

        assert!(email.subject.starts_with("[SupplyChainX] Out of stock"));
        assert!(email.body_html.contains("Nuts &amp; &lt;bolts&gt;"));
        assert!(email.body_text.contains("Nuts & <bolts>"));
    }
}
