pub mod product;
pub mod sales_invoice;
pub mod sales_invoice_line;
pub mod sales_order;
pub mod sales_order_line;
pub mod shipment;
pub mod shipment_allocation;
pub mod shipment_line;
pub mod status_history;
pub mod warehouse;
pub mod warehouse_stock;
