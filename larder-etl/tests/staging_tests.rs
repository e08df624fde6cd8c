//! Staging tables and the `stg_*` view contract

mod helpers;

use chrono::Utc;

use larder_etl::db::{staging, warehouse};
use larder_etl::services::transform_recipes;

#[tokio::test]
async fn test_staging_views_expose_normalized_rows() {
    let (_dir, pool) = helpers::create_test_db().await;
    let recipes = transform_recipes(&helpers::sample_recipes()).unwrap().recipes;

    let counts = staging::stage_recipes(&pool, &recipes, Utc::now())
        .await
        .unwrap();
    assert_eq!(counts.recipes, 2);
    assert_eq!(counts.ingredients, 4, "flour is shared");
    assert_eq!(counts.recipe_ingredients, 5);

    let staged = warehouse::read_staged_recipes(&pool).await.unwrap();
    let keys: Vec<&str> = staged.iter().map(|r| r.recipe_nk.as_str()).collect();
    assert!(keys.contains(&"themealdb:52772"));
    assert!(keys.contains(&"themealdb:52893"));

    let facts = warehouse::read_staged_facts(&pool).await.unwrap();
    let crumble_flour = facts
        .iter()
        .find(|f| f.recipe_nk == "themealdb:52893" && f.ingredient_name == "flour")
        .expect("flour row for the crumble");
    assert_eq!(crumble_flour.measure.as_deref(), Some("200g"));
    assert!(facts.iter().any(|f| f.ingredient_name == "apple"));
}

#[tokio::test]
async fn test_restaging_updates_in_place() {
    let (_dir, pool) = helpers::create_test_db().await;
    let mut recipes = transform_recipes(&helpers::sample_recipes()).unwrap().recipes;
    staging::stage_recipes(&pool, &recipes, Utc::now()).await.unwrap();

    recipes[0].name = Some("Teriyaki Chicken Casserole".to_string());
    recipes[0].ingredients[0].measure = Some("1 cup".to_string());
    let counts = staging::stage_recipes(&pool, &recipes, Utc::now())
        .await
        .unwrap();

    assert_eq!(counts.recipes, 2);
    assert_eq!(counts.recipe_ingredients, 5);

    let staged = warehouse::read_staged_recipes(&pool).await.unwrap();
    let teriyaki = staged
        .iter()
        .find(|r| r.recipe_nk == "themealdb:52772")
        .unwrap();
    assert_eq!(teriyaki.name.as_deref(), Some("Teriyaki Chicken Casserole"));

    let first_ingredient = &recipes[0].ingredients[0].name;
    let facts = warehouse::read_staged_facts(&pool).await.unwrap();
    let row = facts
        .iter()
        .find(|f| f.recipe_nk == "themealdb:52772" && &f.ingredient_name == first_ingredient)
        .unwrap();
    assert_eq!(row.measure.as_deref(), Some("1 cup"));
}

#[tokio::test]
async fn test_empty_batch_stages_nothing() {
    let (_dir, pool) = helpers::create_test_db().await;

    let counts = staging::stage_recipes(&pool, &[], Utc::now()).await.unwrap();

    assert_eq!(counts, staging::StagingCounts::default());
    assert_eq!(helpers::count_rows(&pool, "stg_recipe_ingredients").await, 0);
}
