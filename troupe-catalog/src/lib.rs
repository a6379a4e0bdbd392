pub mod destination;
pub mod pricing;

pub use destination::{
    CatalogError, Destination, DestinationRepository, DiscountPolicy, ItineraryDay, Meal,
};
pub use pricing::{PriceBreakdown, PricingEngine};
