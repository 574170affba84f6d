table! {
    order_lines (id) {
        id -> Int4,
        order_id -> Uuid,
        sku -> Varchar,
        text -> Varchar,
        quantity -> Int4,
        taxful_price -> Numeric,
    }
}

table! {
    order_payments (id) {
        id -> Int4,
        order_id -> Uuid,
        amount -> Numeric,
        payment_identifier -> Varchar,
        created_at -> Timestamp,
    }
}

table! {
    orders (id) {
        id -> Uuid,
        shop_id -> Int4,
        reference -> Varchar,
        customer_name -> Varchar,
        email -> Varchar,
        phone -> Varchar,
        language -> Varchar,
        customer_cpf -> Nullable<Varchar>,
        customer_cnpj -> Nullable<Varchar>,
        shipping_street -> Varchar,
        shipping_city -> Varchar,
        shipping_state -> Nullable<Varchar>,
        shipping_country -> Varchar,
        shipping_postal_code -> Varchar,
        status -> Varchar,
        taxful_total_price -> Numeric,
        paid_total -> Numeric,
        payment_data -> Nullable<Jsonb>,
        created_at -> Timestamp,
    }
}

table! {
    payment_configs (id) {
        id -> Int4,
        shop_id -> Int4,
        email -> Varchar,
        token -> Varchar,
        sandbox -> Bool,
    }
}

table! {
    payments (id) {
        id -> Int4,
        order_id -> Uuid,
        code -> Varchar,
        data -> Nullable<Jsonb>,
        last_update -> Timestamp,
    }
}

joinable!(order_lines -> orders (order_id));
joinable!(order_payments -> orders (order_id));
joinable!(payments -> orders (order_id));

allow_tables_to_appear_in_same_query!(order_lines, order_payments, orders, payment_configs, payments,);
