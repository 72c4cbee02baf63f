use chrono::NaiveDate;
use petstore_core::model::{
    Address, AddressKey, Animal, AnimalKey, LivingEnv, PetStore, Product, ProductKey, ProductType,
    StoreKey,
};
use petstore_core::ops::{link_store_product, set_animal_store, set_store_address, Graph};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Keys of the single-store "Baba" graph
#[allow(dead_code)]
pub struct Baba {
    pub store: StoreKey,
    pub address: AddressKey,
    pub fish: AnimalKey,
    pub product: ProductKey,
}

/// Store "Baba"/"Dialo" with its address, one fresh-water fish and one
/// accessory product, all wired through the association operations
#[allow(dead_code)]
pub fn baba(graph: &mut Graph) -> Baba {
    let address = graph.add_address(Address::new(
        "3B",
        "Impasse des moutons",
        "83500",
        "La Seyne sur Mer",
    ));
    let store = graph.add_store(PetStore::new("Baba", "Dialo"));
    set_store_address(graph, store, Some(address)).unwrap();

    let fish = graph.add_animal(Animal::fish(date(2023, 4, 12), "bleu", LivingEnv::FreshWater));
    set_animal_store(graph, fish, Some(store)).unwrap();

    let product = graph.add_product(Product::new("1", "eco", ProductType::Accessory, 29.99));
    link_store_product(graph, store, Some(product)).unwrap();

    Baba {
        store,
        address,
        fish,
        product,
    }
}

/// The three-store demo graph; returns the store keys in creation order
#[allow(dead_code)]
pub fn three_stores(graph: &mut Graph) -> Vec<StoreKey> {
    let addresses = [
        ("3B", "Impasse des moutons", "83500", "La Seyne sur Mer"),
        ("666", "rue du paradis", "66666", "L'enfer"),
        ("50", "rue de paris", "75000", "Paris"),
    ];
    let stores = [("Baba", "Dialo"), ("Bob", "L'Eponge"), ("Sam", "Sauvage")];
    let products = [
        ("1", "eco", ProductType::Accessory, 29.99),
        ("2", "bio", ProductType::Food, 30.99),
        ("3", "toxic", ProductType::Cleaning, 30.8),
    ];

    let mut keys = Vec::new();
    for ((addr, (name, manager)), (code, label, kind, price)) in
        addresses.iter().zip(stores.iter()).zip(products.iter())
    {
        let address = graph.add_address(Address::new(addr.0, addr.1, addr.2, addr.3));
        let store = graph.add_store(PetStore::new(*name, *manager));
        set_store_address(graph, store, Some(address)).unwrap();
        let product = graph.add_product(Product::new(*code, *label, *kind, *price));
        link_store_product(graph, store, Some(product)).unwrap();
        keys.push(store);
    }

    let animals = [
        (Animal::fish(date(2024, 1, 5), "bleu", LivingEnv::FreshWater), 0),
        (Animal::fish(date(2024, 2, 9), "pink", LivingEnv::SeaWater), 1),
        (Animal::cat(date(2022, 11, 20), "white", "Inconnu"), 2),
        (Animal::cat(date(2023, 3, 14), "black", "Inconnu"), 2),
    ];
    for (animal, store) in animals {
        let key = graph.add_animal(animal);
        set_animal_store(graph, key, Some(keys[store])).unwrap();
    }

    keys
}
