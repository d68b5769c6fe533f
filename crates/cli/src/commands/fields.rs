use csf::FieldType;
use serde::Serialize;

use crate::error::Result;
use crate::output::OutputFormat;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldInfo {
	field_type: FieldType,
	separate_date_field: bool,
}

pub fn execute(format: OutputFormat) -> Result<()> {
	let fields: Vec<_> = FieldType::ALL
		.into_iter()
		.map(|field_type| FieldInfo {
			field_type,
			separate_date_field: field_type.is_separate_date_field(),
		})
		.collect();

	match format {
		OutputFormat::Text => {
			for field in &fields {
				if field.separate_date_field {
					println!("{} (separate date field)", field.field_type);
				} else {
					println!("{}", field.field_type);
				}
			}
		}
		OutputFormat::Json => println!("{}", serde_json::to_string(&fields)?),
	}
	Ok(())
}
