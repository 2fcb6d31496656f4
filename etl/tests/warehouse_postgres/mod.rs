mod postgres_warehouse_test;
