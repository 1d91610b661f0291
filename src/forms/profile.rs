use super::fields::FieldCleaner;
use super::{Form, FormData, FormErrors};
use crate::store::ProfileFields;

/// Address and geocoordinates, usually filled in by the Places autocomplete widget
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileForm {
    pub fields: ProfileFields,
}

impl Form for ProfileForm {
    fn clean(data: &FormData) -> Result<Self, FormErrors> {
        let mut cleaner = FieldCleaner::new(data);
        let fields = ProfileFields {
            address: cleaner.char_field("address", Some(100)),
            town: cleaner.char_field("town", Some(50)),
            county: cleaner.char_field("county", Some(50)),
            post_code: cleaner.char_field("post_code", Some(8)),
            country: cleaner.char_field("country", Some(50)),
            longitude: cleaner.char_field("longitude", Some(50)),
            latitude: cleaner.char_field("latitude", Some(50)),
        };
        cleaner.errors.into_result(|| ProfileForm { fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_data() -> FormData {
        [
            ("address", "1 Infinite Loop"),
            ("town", "Cupertino"),
            ("county", "Santa Clara"),
            ("post_code", "95014"),
            ("country", "United States"),
            ("longitude", "-122.0312"),
            ("latitude", "37.3318"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_valid_profile() {
        let form = ProfileForm::clean(&valid_data()).unwrap();
        assert_eq!(form.fields.town, "Cupertino");
        assert_eq!(form.fields.latitude, "37.3318");
    }

    #[test]
    fn test_every_field_required() {
        let errors = ProfileForm::clean(&FormData::new()).unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["address", "town", "county", "post_code", "country", "longitude", "latitude"]
        );
    }

    #[test]
    fn test_post_code_limit() {
        let mut data = valid_data();
        data.insert("post_code".to_string(), "123456789".to_string());
        let errors = ProfileForm::clean(&data).unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["post_code"]);
    }
}
