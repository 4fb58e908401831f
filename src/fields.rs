//! Static field vocabulary for the district census table.
//!
//! Canonical field names are the column labels that flow through every stage
//! after normalization and become document keys in the document store. SQL
//! column names are the snake-cased form of the canonical names.

use heck::ToSnakeCase;

pub const DISTRICT_CODE: &str = "District_code";
pub const DISTRICT: &str = "District";
pub const REGION: &str = "State/UT";

pub const POPULATION: &str = "Population";
pub const MALE: &str = "Male";
pub const FEMALE: &str = "Female";
pub const LITERATE: &str = "Literate";
pub const LITERATE_MALE: &str = "Literate_Male";
pub const LITERATE_FEMALE: &str = "Literate_Female";
pub const HOUSEHOLDS: &str = "Households";
pub const HOUSEHOLDS_RURAL: &str = "Households_Rural";
pub const HOUSEHOLDS_URBAN: &str = "Households_Urban";

/// Raw source label to canonical label. Labels not listed pass through unchanged.
pub const LABEL_MAPPING: &[(&str, &str)] = &[
    ("District code", DISTRICT_CODE),
    ("State name", REGION),
    ("District name", DISTRICT),
    ("Male_Literate", LITERATE_MALE),
    ("Female_Literate", LITERATE_FEMALE),
    ("Rural_Households", HOUSEHOLDS_RURAL),
    ("Urban_Households", HOUSEHOLDS_URBAN),
    ("Age_Group_0_29", "Young_and_Adult"),
    ("Age_Group_30_49", "Middle_Aged"),
    ("Age_Group_50", "Senior_Citizen"),
    ("Age not stated", "Age_Not_Stated"),
    (
        "Households_with_TV_Computer_Laptop_Telephone_mobile_phone_and_Scooter_Car",
        "Multi_Amenities_Households",
    ),
    (
        "Type_of_latrine_facility_Night_soil_disposed_into_open_drain_Households",
        "Latrine_Nightsoil_Open_Drain_Households",
    ),
    (
        "Type_of_latrine_facility_Flush_pour_flush_latrine_connected_to_other_system_Households",
        "Latrine_Flush_Connected_Other_System_Households",
    ),
    (
        "Not_having_latrine_facility_within_the_premises_Alternative_source_Open_Households",
        "No_Latrine_Open_Source_Households",
    ),
    (
        "Main_source_of_drinking_water_Handpump_Tubewell_Borewell_Households",
        "Drinking_Water_Handpump_Tubewell_Borewell_Households",
    ),
    (
        "Main_source_of_drinking_water_Other_sources_Spring_River_Canal_Tank_Pond_Lake_Other_sources__Households",
        "Drinking_Water_Other_Sources_Households",
    ),
];

/// A (total, part_a, part_b) group bound by `total = part_a + part_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triple {
    pub total: &'static str,
    pub part_a: &'static str,
    pub part_b: &'static str,
}

impl Triple {
    pub const fn fields(&self) -> [&'static str; 3] {
        [self.total, self.part_a, self.part_b]
    }
}

/// Resolution order is significant: population first, then literacy, then households.
pub const TRIPLES: [Triple; 3] = [
    Triple {
        total: POPULATION,
        part_a: MALE,
        part_b: FEMALE,
    },
    Triple {
        total: LITERATE,
        part_a: LITERATE_MALE,
        part_b: LITERATE_FEMALE,
    },
    Triple {
        total: HOUSEHOLDS,
        part_a: HOUSEHOLDS_RURAL,
        part_b: HOUSEHOLDS_URBAN,
    },
];

/// Fields whose missingness is reported before and after resolution.
pub const TRACKED_FIELDS: [&str; 5] = [LITERATE, FEMALE, HOUSEHOLDS, MALE, POPULATION];

/// Canonical fields every downstream stage depends on.
pub const REQUIRED_FIELDS: [&str; 12] = [
    DISTRICT_CODE,
    REGION,
    DISTRICT,
    POPULATION,
    MALE,
    FEMALE,
    LITERATE,
    LITERATE_MALE,
    LITERATE_FEMALE,
    HOUSEHOLDS,
    HOUSEHOLDS_RURAL,
    HOUSEHOLDS_URBAN,
];

/// Measures persisted into the demographic fact table.
pub const CENSUS_MEASURES: &[&str] = &[
    POPULATION,
    MALE,
    FEMALE,
    LITERATE,
    LITERATE_MALE,
    LITERATE_FEMALE,
    "SC",
    "Male_SC",
    "Female_SC",
    "ST",
    "Male_ST",
    "Female_ST",
    "Workers",
    "Male_Workers",
    "Female_Workers",
    "Main_Workers",
    "Marginal_Workers",
    "Non_Workers",
    "Cultivator_Workers",
    "Agricultural_Workers",
    "Household_Workers",
    "Other_Workers",
    "Hindus",
    "Muslims",
    "Christians",
    "Sikhs",
    "Buddhists",
    "Jains",
    "Others_Religions",
    "Religion_Not_Stated",
    "Below_Primary_Education",
    "Primary_Education",
    "Middle_Education",
    "Secondary_Education",
    "Higher_Education",
    "Graduate_Education",
    "Other_Education",
    "Literate_Education",
    "Illiterate_Education",
    "Total_Education",
    "Young_and_Adult",
    "Middle_Aged",
    "Senior_Citizen",
    "Age_Not_Stated",
    "Power_Parity_Less_than_Rs_45000",
    "Power_Parity_Rs_45000_90000",
    "Power_Parity_Rs_90000_150000",
    "Power_Parity_Rs_45000_150000",
    "Power_Parity_Rs_150000_240000",
    "Power_Parity_Rs_240000_330000",
    "Power_Parity_Rs_150000_330000",
    "Power_Parity_Rs_330000_425000",
    "Power_Parity_Rs_425000_545000",
    "Power_Parity_Rs_330000_545000",
    "Power_Parity_Above_Rs_545000",
    "Total_Power_Parity",
];

/// Measures persisted into the household amenities fact table.
pub const HOUSEHOLD_MEASURES: &[&str] = &[
    "LPG_or_PNG_Households",
    "Housholds_with_Electric_Lighting",
    "Households_with_Internet",
    "Households_with_Computer",
    HOUSEHOLDS_RURAL,
    HOUSEHOLDS_URBAN,
    HOUSEHOLDS,
    "Households_with_Bicycle",
    "Households_with_Car_Jeep_Van",
    "Households_with_Radio_Transistor",
    "Households_with_Scooter_Motorcycle_Moped",
    "Households_with_Telephone_Mobile_Phone_Landline_only",
    "Households_with_Telephone_Mobile_Phone_Mobile_only",
    "Multi_Amenities_Households",
    "Households_with_Television",
    "Households_with_Telephone_Mobile_Phone",
    "Households_with_Telephone_Mobile_Phone_Both",
    "Condition_of_occupied_census_houses_Dilapidated_Households",
    "Households_with_separate_kitchen_Cooking_inside_house",
    "Having_bathing_facility_Total_Households",
    "Having_latrine_facility_within_the_premises_Total_Households",
    "Ownership_Owned_Households",
    "Ownership_Rented_Households",
    "Type_of_bathing_facility_Enclosure_without_roof_Households",
    "Type_of_fuel_used_for_cooking_Any_other_Households",
    "Type_of_latrine_facility_Pit_latrine_Households",
    "Type_of_latrine_facility_Other_latrine_Households",
    "Latrine_Nightsoil_Open_Drain_Households",
    "Latrine_Flush_Connected_Other_System_Households",
    "Not_having_bathing_facility_within_the_premises_Total_Households",
    "No_Latrine_Open_Source_Households",
    "Main_source_of_drinking_water_Un_covered_well_Households",
    "Drinking_Water_Handpump_Tubewell_Borewell_Households",
    "Main_source_of_drinking_water_Spring_Households",
    "Main_source_of_drinking_water_River_Canal_Households",
    "Main_source_of_drinking_water_Other_sources_Households",
    "Drinking_Water_Other_Sources_Households",
    "Location_of_drinking_water_source_Near_the_premises_Households",
    "Location_of_drinking_water_source_Within_the_premises_Households",
    "Main_source_of_drinking_water_Tank_Pond_Lake_Households",
    "Main_source_of_drinking_water_Tapwater_Households",
    "Main_source_of_drinking_water_Tubewell_Borehole_Households",
    "Household_size_1_person_Households",
    "Household_size_2_persons_Households",
    "Household_size_1_to_2_persons",
    "Household_size_3_persons_Households",
    "Household_size_3_to_5_persons_Households",
    "Household_size_4_persons_Households",
    "Household_size_5_persons_Households",
    "Household_size_6_8_persons_Households",
    "Household_size_9_persons_and_above_Households",
    "Location_of_drinking_water_source_Away_Households",
    "Married_couples_1_Households",
    "Married_couples_2_Households",
    "Married_couples_3_Households",
    "Married_couples_3_or_more_Households",
    "Married_couples_4_Households",
    "Married_couples_5__Households",
    "Married_couples_None_Households",
];

/// SQL column name for a canonical field.
pub fn sql_column(field: &str) -> String {
    field.to_snake_case()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn fact_tables_have_expected_widths() {
        assert_eq!(CENSUS_MEASURES.len(), 56);
        assert_eq!(HOUSEHOLD_MEASURES.len(), 59);
    }

    #[test]
    fn sql_columns_are_unique_per_fact_table() {
        for measures in [CENSUS_MEASURES, HOUSEHOLD_MEASURES] {
            let columns = measures.iter().map(|m| sql_column(m)).collect::<HashSet<_>>();
            assert_eq!(columns.len(), measures.len());
        }
    }

    #[test]
    fn sql_column_snake_cases_canonical_names() {
        assert_eq!(sql_column("Literate_Male"), "literate_male");
        assert_eq!(sql_column("LPG_or_PNG_Households"), "lpg_or_png_households");
        assert_eq!(
            sql_column("Married_couples_5__Households"),
            "married_couples_5_households"
        );
        assert_eq!(sql_column("Male_SC"), "male_sc");
    }

    #[test]
    fn every_mapping_target_is_distinct() {
        let targets = LABEL_MAPPING.iter().map(|(_, to)| *to).collect::<HashSet<_>>();
        assert_eq!(targets.len(), LABEL_MAPPING.len());
    }
}
