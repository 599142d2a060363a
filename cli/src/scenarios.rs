//! Bundled order texts and what a correct extraction of each must contain.

use orderly::assertions::{Expectations, ValueKind};
use orderly::config::ConfigurationError;

/// Schedule representation a scenario is extracted with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Text,
    Structured,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub profile: Profile,
    pub input: &'static str,
    expectations: fn() -> Expectations,
}

impl Scenario {
    #[must_use]
    pub fn expectations(&self) -> Expectations {
        (self.expectations)()
    }
}

const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "new-york",
        profile: Profile::Text,
        input: "Jason has ordered 5 pizzas to be delivered on July 4th, 2024 at 4:00 PM: \
                2 large Hawaiian pizzas, 3 medium Pepperoni pizzas. He is staying at \
                123 Main St, Apt 4B, New York, NY 10001.",
        expectations: new_york,
    },
    Scenario {
        name: "dubai",
        profile: Profile::Structured,
        input: "Jason has ordered 5 pizzas to be delivered on 4th July 2024 at 4pm: \
                2 large Hawaiian pizzas, 3 medium Pepperoni pizzas. He is staying in \
                Marina Pearl Tower Unit 1204, Al Marsa Street, Makani: 1234567890",
        expectations: dubai,
    },
    Scenario {
        name: "dubai-no-makani",
        profile: Profile::Structured,
        input: "Aisha wants 1 small Margherita pizza delivered on 5th July 2024 at 7pm \
                to Marina Pearl Tower Unit 1204, Al Marsa Street, Dubai.",
        expectations: dubai_no_makani,
    },
    Scenario {
        name: "no-items",
        profile: Profile::Text,
        input: "Hi, this is Jason at 123 Main St, Apt 4B, New York, NY 10001. Do you deliver \
                on July 4th, 2024 around 4:00 PM? I'm not ordering anything yet.",
        expectations: no_items,
    },
];

fn new_york() -> Expectations {
    Expectations::new()
        .equals("name", "Jason")
        .sum("order.order_list[*].quantity", 5)
        .equals("order.delivery_date", "July 4th, 2024")
        .equals("order.delivery_time", "4:00 PM")
        .equals("address.street", "123 Main St, Apt 4B")
        .equals("address.city", "New York")
        .equals("address.region", "NY")
        .equals("address.postal_code", "10001")
}

fn dubai() -> Expectations {
    Expectations::new()
        .equals("name", "Jason")
        .kind("is_repeat_order", ValueKind::Boolean)
        .kind("order.delivery_date", ValueKind::DateTime)
        .kind("order.delivery_time", ValueKind::Time)
        .sum("order.order_list[*].quantity", 5)
        .equals("order.order_list[0].name", "Hawaiian")
        .equals("order.order_list[1].name", "Pepperoni")
        .equals("order.order_list[0].size", "large")
        .equals("order.order_list[1].size", "medium")
        .equals("order.order_list[0].quantity", 2)
        .equals("order.order_list[1].quantity", 3)
        .equals("address.building_name", "Marina Pearl Tower")
        .equals("address.street", "Al Marsa Street")
        .equals("address.city", "Dubai")
        .equals("address.region", "Dubai")
        .equals("address.country", "United Arab Emirates")
        .equals("address.locator", 1_234_567_890_u64)
        .not_empty("chain_of_thought")
        .kind("address.area_name", ValueKind::String)
        .title_case("order.order_list[*].name")
}

fn dubai_no_makani() -> Expectations {
    Expectations::new()
        .equals("name", "Aisha")
        .equals("order.order_list[0].name", "Margherita")
        .equals("order.order_list[0].size", "small")
        .sum("order.order_list[*].quantity", 1)
        .equals("address.city", "Dubai")
        .equals("address.country", "United Arab Emirates")
        .equals("address.locator", -1)
}

fn no_items() -> Expectations {
    Expectations::new()
        .equals("name", "Jason")
        .len_equals("order.order_list", 0)
        .equals("is_repeat_order", false)
        .equals("address.city", "New York")
}

/// Scenarios named in `names`, every scenario when `names` is empty
pub fn select(names: &[String]) -> Result<Vec<Scenario>, ConfigurationError> {
    if names.is_empty() {
        return Ok(SCENARIOS.to_vec());
    }
    names
        .iter()
        .map(|name| {
            SCENARIOS
                .iter()
                .find(|s| s.name == name)
                .cloned()
                .ok_or_else(|| ConfigurationError::UnknownScenario(name.clone()))
        })
        .collect()
}
