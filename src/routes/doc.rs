use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        addresses::AddressList,
        admin::{SettingsDto, UpdateUserRoleRequest, UserList},
        cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
        orders::{
            CreateOrderRequest, OrderLineRequest, OrderList, OrderWithItems, StoreOrderDto,
            StoreOrderList, TicketOrderDto, UpdateOrderStatusRequest,
        },
        payments::{CreatePaymentRequest, PaymentList, PaymentResponse},
        products,
        stores::{StoreList, StoreWithProducts},
    },
    models::{
        Address, CartItem, Order, OrderItem, OrderStatus, Payment, Product, Store, TicketQr, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        addresses, admin, auth, cart, health, orders, params, payments,
        products as product_routes, seller, stores, tourism,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        product_routes::list_products,
        product_routes::create_product,
        product_routes::get_product,
        product_routes::update_product,
        product_routes::delete_product,
        stores::list_stores,
        stores::create_store,
        stores::get_my_store,
        stores::update_my_store,
        stores::get_store_by_slug,
        addresses::list_addresses,
        addresses::create_address,
        addresses::update_address,
        addresses::delete_address,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_order_status,
        payments::create_payment,
        payments::list_payments,
        seller::list_store_orders,
        seller::get_store_order,
        tourism::list_ticket_orders,
        tourism::get_ticket_order,
        tourism::update_ticket_order_status,
        admin::list_users,
        admin::update_user_role,
        admin::get_settings,
        admin::update_settings
    ),
    components(
        schemas(
            User,
            Store,
            Product,
            Address,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            Payment,
            TicketQr,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartList,
            CreateOrderRequest,
            OrderLineRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderWithItems,
            StoreOrderDto,
            StoreOrderList,
            TicketOrderDto,
            CreatePaymentRequest,
            PaymentResponse,
            PaymentList,
            products::ProductList,
            StoreList,
            StoreWithProducts,
            AddressList,
            UserList,
            UpdateUserRoleRequest,
            SettingsDto,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CartList>,
            ApiResponse<PaymentResponse>,
            ApiResponse<SettingsDto>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Product catalog and seller product management"),
        (name = "Stores", description = "Store endpoints"),
        (name = "Addresses", description = "Address book endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Payments", description = "Hosted-checkout payment endpoints"),
        (name = "Seller", description = "Seller order views"),
        (name = "Tourism", description = "Tourism manager ticket orders"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
