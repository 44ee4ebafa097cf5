extern crate stache;
use stache::{Member, Reflect, Template, Value};

use serde::Serialize;


struct Customer {
    name: String,
    balance: f64,
    orders: Vec<Order>,
}

struct Order {
    id: u32,
    shipped: bool,
}

impl Reflect for Customer {
    fn members() -> Vec<Member<Self>> {
        vec![
            Member::new("Name", |c| Value::text(&c.name)),
            Member::new("Balance", |c| Value::from(c.balance)),
            Member::new("Orders", |c| {
                Value::sequence(c.orders.iter().map(|o| Value::object(Order { ..*o })).collect())
            }),
        ]
    }
}

impl Reflect for Order {
    fn members() -> Vec<Member<Self>> {
        vec![
            Member::new("Id", |o| Value::from(o.id)),
            Member::new("Shipped", |o| Value::from(o.shipped)),
        ]
    }
}

fn customer() -> Value {
    Value::object(Customer {
        name: "Ana".to_owned(),
        balance: 1234.5,
        orders: vec![Order { id: 1, shipped: true }, Order { id: 2, shipped: false }],
    })
}


#[test]
fn members_are_read_by_name() {
    let template = Template::from("{{Name}} owes {{Balance:N2}}").unwrap();
    assert_eq!(template.render(&customer()).unwrap(), "Ana owes 1,234.50");
}

#[test]
fn nested_objects_and_sequences() {
    let template = Template::from(
        "{{#each Orders}}#{{Id}}{{#if Shipped}} shipped{{else}} pending{{/if}};{{/each}}"
    ).unwrap();
    assert_eq!(template.render(&customer()).unwrap(), "#1 shipped;#2 pending;");
}

#[test]
fn unknown_members_are_missing_keys() {
    let template = Template::from("{{Email}}").unwrap();
    assert!(template.render(&customer()).is_err());
}

#[test]
fn objects_inside_mappings() {
    let data = Value::from_iter([("customer", customer())]);
    let template = Template::from("{{customer.Name}} {{customer.Orders.count}}").unwrap();
    assert_eq!(template.render(&data).unwrap(), "Ana 2");
}

#[test]
fn objects_render_their_type_name() {
    let template = Template::from("{{this}}").unwrap();
    let text = template.render(&customer()).unwrap();
    assert!(text.ends_with("Customer"), "{}", text);
}

#[test]
fn serializable_types() {
    #[derive(Serialize)]
    struct Invoice {
        number: String,
        lines: Vec<Line>,
    }

    #[derive(Serialize)]
    struct Line {
        item: &'static str,
        amount: f64,
    }

    let invoice = Invoice {
        number: "A-7".to_owned(),
        lines: vec![
            Line { item: "tea", amount: 3.5 },
            Line { item: "cake", amount: 12.0 },
        ],
    };
    let template = Template::from(
        "{{number}}:{{#each lines}} {{item,-5}}{{amount,6:F2}}{{/each}}"
    ).unwrap();
    let data = Value::from_serialize(&invoice).unwrap();
    assert_eq!(template.render(&data).unwrap(), "A-7: tea    3.50 cake  12.00");
}
