use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::prelude::*;
use rust_decimal_macros::*;
use serde::Serialize;

use core_types::{PaymentData, PaymentMethod};

use crate::xml;
use xerror::gateway::GatewayError;

pub const PAYMENT_CURRENCY: &str = "BRL";

lazy_static! {
    static ref PHONE_MATCHER: Regex = Regex::new(r"\(?(\d{2})\)?\D*(\d+)\D*(\d*)").expect("phone pattern");
}

/// Plain snapshot of the order data the builder needs. Decoupled from the
/// storage row so building stays a pure function.
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    pub reference: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub taxful_total_price: Decimal,
    pub lines: Vec<LineSnapshot>,
    pub shipping_address: AddressSnapshot,
    pub cpf: Option<String>,
    pub cnpj: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LineSnapshot {
    pub sku: String,
    pub text: String,
    pub quantity: i32,
    pub taxful_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct AddressSnapshot {
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub country: String,
    pub postal_code: String,
}

/// Gateway payment document, serialized under a `<payment>` root.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub currency: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<PaymentBank>,
    pub sender: Sender,
    pub items: Items,
    #[serde(rename = "extraAmount")]
    pub extra_amount: String,
    pub reference: String,
    pub shipping: Shipping,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentBank {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sender {
    pub name: String,
    pub email: String,
    pub phone: Phone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Documents>,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Phone {
    #[serde(rename = "areaCode")]
    pub area_code: String,
    pub number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Documents {
    pub document: Document,
}

#[derive(Debug, Clone, Serialize)]
pub struct Document {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Items {
    pub item: Vec<Item>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Item {
    pub id: String,
    pub description: String,
    pub quantity: String,
    pub amount: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Shipping {
    pub address: Address,
}

#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub street: String,
    #[serde(rename = "postalCode")]
    pub postal_code: String,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub country: String,
}

/// Area code and local number extracted from a free-form phone string.
/// No match yields two empty strings; request construction never aborts
/// over an unparseable phone.
pub fn parse_phone(phone: &str) -> (String, String) {
    match PHONE_MATCHER.captures(phone) {
        Some(caps) => {
            let area_code = caps[1].to_string();
            let number = format!("{}{}", &caps[2], caps.get(3).map(|m| m.as_str()).unwrap_or(""));
            (area_code, number)
        }
        None => (String::new(), String::new()),
    }
}

pub fn only_digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn select_document(order: &OrderSnapshot) -> Option<Document> {
    if let Some(cpf) = order.cpf.as_deref().map(only_digits).filter(|v| !v.is_empty()) {
        return Some(Document {
            kind: "CPF".to_string(),
            value: cpf,
        });
    }
    if let Some(cnpj) = order.cnpj.as_deref().map(only_digits).filter(|v| !v.is_empty()) {
        return Some(Document {
            kind: "CNPJ".to_string(),
            value: cnpj,
        });
    }
    None
}

/// Builds the gateway payment document from an order snapshot and the
/// checkout phase's validated payment-data bag. Lines priced at or below
/// zero are excluded; the difference between the order total and the
/// included lines goes into `extraAmount`, so
/// `sum(included) + extraAmount == order_total` always holds. Method and
/// bank come in pre-validated; the builder does not re-check them.
pub fn build_payment(order: &OrderSnapshot, payment_data: &PaymentData) -> Payment {
    let mut items = Vec::new();
    let mut total_lines = dec!(0);
    for line in &order.lines {
        if line.taxful_price > dec!(0) {
            total_lines += line.taxful_price;
            items.push(Item {
                id: line.sku.clone(),
                description: line.text.clone(),
                quantity: line.quantity.to_string(),
                amount: format!("{:.2}", line.taxful_price),
            });
        }
    }
    let extra_amount = order.taxful_total_price - total_lines;

    let (area_code, number) = parse_phone(&order.phone);

    let bank = match payment_data.payment_method {
        PaymentMethod::OnlineDebit => payment_data.bank_name.map(|bank| PaymentBank {
            name: bank.wire_name().to_string(),
        }),
        PaymentMethod::Boleto => None,
    };

    Payment {
        currency: PAYMENT_CURRENCY.to_string(),
        method: payment_data.payment_method.identifier().to_string(),
        bank,
        sender: Sender {
            name: order.customer_name.clone(),
            email: order.email.clone(),
            phone: Phone { area_code, number },
            documents: select_document(order).map(|document| Documents { document }),
            hash: payment_data.sender_hash.clone(),
        },
        items: Items { item: items },
        extra_amount: format!("{:.2}", extra_amount),
        reference: order.reference.clone(),
        shipping: Shipping {
            address: Address {
                street: order.shipping_address.street.clone(),
                postal_code: only_digits(&order.shipping_address.postal_code),
                city: order.shipping_address.city.clone(),
                state: order.shipping_address.state.clone(),
                country: order.shipping_address.country.clone(),
            },
        },
    }
}

pub fn to_xml(payment: &Payment) -> Result<String, GatewayError> {
    xml::to_xml("payment", payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Bank;

    fn snapshot() -> OrderSnapshot {
        OrderSnapshot {
            reference: "REF1234".to_string(),
            customer_name: "Dog Hello".to_string(),
            email: "comprador@uol.com.br".to_string(),
            phone: "47 98821-2231".to_string(),
            taxful_total_price: dec!(9.00),
            lines: vec![LineSnapshot {
                sku: "0001".to_string(),
                text: "Default Product".to_string(),
                quantity: 1,
                taxful_price: dec!(9.00),
            }],
            shipping_address: AddressSnapshot {
                street: "Woof Ave.".to_string(),
                city: "Dog Fort".to_string(),
                state: None,
                country: "BRA".to_string(),
                postal_code: "89999-999".to_string(),
            },
            cpf: None,
            cnpj: None,
        }
    }

    fn debit_data() -> PaymentData {
        PaymentData {
            payment_method: PaymentMethod::OnlineDebit,
            bank_name: Some(Bank::BancoDoBrasil),
            bank_option: Some("304".to_string()),
            sender_hash: "J7E98Y37WEIRUHDIAI9U8RYE7UQE".to_string(),
            code: None,
            payment_link: None,
        }
    }

    #[test]
    fn parses_area_code_and_number() {
        let (area_code, number) = parse_phone("47 98821-2231");
        assert_eq!(area_code, "47");
        assert_eq!(number, "988212231");
    }

    #[test]
    fn parses_parenthesized_area_code() {
        let (area_code, number) = parse_phone("(11) 5627-3440");
        assert_eq!(area_code, "11");
        assert_eq!(number, "56273440");
    }

    #[test]
    fn unparseable_phone_yields_empty_fields() {
        let (area_code, number) = parse_phone("no digits here");
        assert_eq!(area_code, "");
        assert_eq!(number, "");
    }

    #[test]
    fn cpf_wins_over_absent_cnpj() {
        let mut order = snapshot();
        order.cpf = Some("012.345.678-90".to_string());
        let payment = build_payment(&order, &debit_data());
        let document = payment.sender.documents.unwrap().document;
        assert_eq!(document.kind, "CPF");
        assert_eq!(document.value, "01234567890");
    }

    #[test]
    fn cnpj_used_when_no_cpf() {
        let mut order = snapshot();
        order.cnpj = Some("80.033.176/0001-89".to_string());
        let payment = build_payment(&order, &debit_data());
        let document = payment.sender.documents.unwrap().document;
        assert_eq!(document.kind, "CNPJ");
        assert_eq!(document.value, "80033176000189");
    }

    #[test]
    fn cpf_takes_precedence_over_cnpj() {
        let mut order = snapshot();
        order.cpf = Some("012.345.678-90".to_string());
        order.cnpj = Some("80.033.176/0001-89".to_string());
        let payment = build_payment(&order, &debit_data());
        assert_eq!(payment.sender.documents.unwrap().document.kind, "CPF");
    }

    #[test]
    fn no_profile_means_no_document_block() {
        let payment = build_payment(&snapshot(), &debit_data());
        assert!(payment.sender.documents.is_none());
    }

    #[test]
    fn zero_priced_lines_fold_into_extra_amount() {
        let mut order = snapshot();
        order.lines.push(LineSnapshot {
            sku: "FREEBIE".to_string(),
            text: "Free gift".to_string(),
            quantity: 1,
            taxful_price: dec!(0),
        });
        order.lines.push(LineSnapshot {
            sku: "DISCOUNT".to_string(),
            text: "Campaign discount".to_string(),
            quantity: 1,
            taxful_price: dec!(-2.00),
        });
        order.taxful_total_price = dec!(7.00);

        let payment = build_payment(&order, &debit_data());
        assert_eq!(payment.items.item.len(), 1);
        // total 7.00, included lines sum 9.00
        assert_eq!(payment.extra_amount, "-2.00");
    }

    #[test]
    fn extra_amount_holds_when_no_line_is_included() {
        let mut order = snapshot();
        order.lines[0].taxful_price = dec!(0);
        let payment = build_payment(&order, &debit_data());
        assert!(payment.items.item.is_empty());
        assert_eq!(payment.extra_amount, "9.00");
    }

    #[test]
    fn extra_amount_is_zero_when_lines_cover_total() {
        let payment = build_payment(&snapshot(), &debit_data());
        assert_eq!(payment.extra_amount, "0.00");
    }

    #[test]
    fn postal_code_is_digits_only() {
        let payment = build_payment(&snapshot(), &debit_data());
        assert_eq!(payment.shipping.address.postal_code, "89999999");
    }

    #[test]
    fn rendered_document_round_trips_through_the_parser() {
        let mut order = snapshot();
        order.cpf = Some("012.345.678-90".to_string());
        let payment = build_payment(&order, &debit_data());
        let rendered = to_xml(&payment).unwrap();
        let doc = crate::xml::parse_document(&rendered).unwrap();

        assert_eq!(crate::xml::text_at(&doc, &["payment", "currency"]), Some("BRL"));
        assert_eq!(crate::xml::text_at(&doc, &["payment", "method"]), Some("eft"));
        assert_eq!(crate::xml::text_at(&doc, &["payment", "bank", "name"]), Some("bancodobrasil"));
        assert_eq!(
            crate::xml::text_at(&doc, &["payment", "sender", "phone", "areaCode"]),
            Some("47")
        );
        assert_eq!(
            crate::xml::text_at(&doc, &["payment", "sender", "phone", "number"]),
            Some("988212231")
        );
        assert_eq!(
            crate::xml::text_at(&doc, &["payment", "sender", "documents", "document", "type"]),
            Some("CPF")
        );
        assert_eq!(
            crate::xml::text_at(&doc, &["payment", "sender", "documents", "document", "value"]),
            Some("01234567890")
        );
    }

    #[test]
    fn boleto_payment_carries_no_bank_block() {
        let data = PaymentData {
            payment_method: PaymentMethod::Boleto,
            bank_name: None,
            bank_option: None,
            sender_hash: "HASH".to_string(),
            code: None,
            payment_link: None,
        };
        let payment = build_payment(&snapshot(), &data);
        assert_eq!(payment.method, "boleto");
        assert!(payment.bank.is_none());
    }
}
